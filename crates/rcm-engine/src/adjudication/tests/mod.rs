mod common;

mod advisory;
mod aggregate;
