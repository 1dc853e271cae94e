//! Integration test crate for the UGC capsule pipeline.
//!
//! Holds cross-crate tests only: enhancement batches feeding the session,
//! and the composer driving a fake encoding engine.

#[cfg(test)]
mod support;

#[cfg(test)]
mod session;

#[cfg(test)]
mod compose;
