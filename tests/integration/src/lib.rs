//! Integration tests for the SSO agent workspace. The tests live in `tests/`.
