//! Cross-crate tests for the query engine live under `tests/`.
