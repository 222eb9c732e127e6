use super::DocumentParser;
use crate::error::DocqaError;

#[derive(Debug, Default, Clone, Copy)]
pub struct TextParser;

impl DocumentParser for TextParser {
    fn parse(&self, input: &[u8]) -> Result<String, DocqaError> {
        Ok(String::from_utf8_lossy(input).to_string())
    }
}
