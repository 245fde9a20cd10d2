#[macro_use]
mod assert_vec_contains_macro;
