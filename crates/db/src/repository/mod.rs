//! Repository functions: generic CRUD over any table.
//!
//! Every function takes a `&Db` and a `&QueryOpts` and returns a
//! `Result<T, DbError>`. Rows go in camelCase and come out camelCase unless
//! `snake_case` is set.

pub mod common;

pub use common::{
    bulk_insert, generic_get_all, generic_get_many, generic_list, get_any, insert_and_return,
    update_and_return,
};
