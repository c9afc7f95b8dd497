use std::cell::RefCell;

struct Frame {
    messages: usize,
    indent: usize,
}

thread_local! {
    static FRAMES: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

pub fn depth() -> usize {
    FRAMES.with_borrow(|frames| frames.len())
}

pub fn indentation() -> usize {
    FRAMES.with_borrow(|frames| frames.iter().map(|frame| frame.indent).sum())
}

pub fn push(indent: usize) {
    FRAMES.with_borrow_mut(|frames| frames.push(Frame { messages: 0, indent }));
}

pub fn pop() {
    FRAMES.with_borrow_mut(|frames| {
        frames.pop();
    });
}

/// Counts a message for the innermost frame and returns how many messages it
/// had before.
pub fn count_message() -> usize {
    FRAMES.with_borrow_mut(|frames| match frames.last_mut() {
        Some(frame) => {
            frame.messages += 1;
            frame.messages - 1
        }
        None => 0,
    })
}

pub fn innermost_messages() -> usize {
    FRAMES.with_borrow(|frames| frames.last().map_or(0, |frame| frame.messages))
}
