#![allow(missing_docs)]

pub(crate) mod http;
pub(crate) mod server;

pub(crate) use http::assert_error_body;
pub(crate) use server::{
    create_test_transaction, get_test_app_state, get_test_server, register_and_log_in,
};
