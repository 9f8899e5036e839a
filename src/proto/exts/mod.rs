mod error_ext;
mod key_ext;

#[cfg(test)]
mod key_ext_test;
