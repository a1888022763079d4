pub use translate_and_validate::TranslateAndValidate;
mod translate_and_validate;
