//! The seam between documents and a translation service.

use crate::error::Result;

/// Translates one piece of text.
///
/// Implementations are stateless from the caller's point of view: every
/// call is independent, synchronous and not retried.
pub trait Translator {
    /// Translate `text` from `source` into `target` (language codes).
    fn translate(&self, text: &str, target: &str, source: &str) -> Result<String>;
}

impl<T: Translator + ?Sized> Translator for &T {
    fn translate(&self, text: &str, target: &str, source: &str) -> Result<String> {
        (**self).translate(text, target, source)
    }
}

impl<T: Translator + ?Sized> Translator for Box<T> {
    fn translate(&self, text: &str, target: &str, source: &str) -> Result<String> {
        (**self).translate(text, target, source)
    }
}

/// Returns every fragment unchanged. Used for dry runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunTranslator;

impl Translator for DryRunTranslator {
    fn translate(&self, text: &str, target: &str, source: &str) -> Result<String> {
        log::info!("[dry run] {} -> {}: {:?}", source, target, text);
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_run_echoes() {
        let translator = DryRunTranslator;
        assert_eq!(translator.translate("Hello", "de", "en").unwrap(), "Hello");
    }

    #[test]
    fn test_boxed_translator() {
        let translator: Box<dyn Translator> = Box::new(DryRunTranslator);
        assert_eq!(translator.translate("Hi", "fr", "en").unwrap(), "Hi");
    }
}
