//! Debug output shared by the chorus crates. Messages are indented by the
//! number of running [`Timer`](logging::Timer)s on the current thread.
#![warn(missing_docs)]

#[macro_use]
pub mod logging;
