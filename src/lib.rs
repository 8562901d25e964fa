//! End-to-end tests for the consulmeta workspace live in `tests/`; they drive
//! the adapter against a mocked Consul HTTP API.
