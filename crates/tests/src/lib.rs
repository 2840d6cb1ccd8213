//! Integration tests for the turn executors live in `tests/`.
