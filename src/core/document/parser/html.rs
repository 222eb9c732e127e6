use super::DocumentParser;
use crate::error::DocqaError;
use scraper::Html;

/// Elements whose text is never visible on the rendered page.
const SKIP: &[&str] = &["head", "script", "style", "noscript", "template", "svg"];

/// Parses HTML pages into their visible text, one text node per line.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlParser;

impl DocumentParser for HtmlParser {
    fn parse(&self, input: &[u8]) -> Result<String, DocqaError> {
        let raw = String::from_utf8_lossy(input);
        let html = Html::parse_document(&raw);

        let mut out = String::new();

        for node in html.tree.root().descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };

            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|el| SKIP.contains(&el.name()))
            });

            if hidden {
                continue;
            }

            let line = text.split_whitespace().collect::<Vec<_>>().join(" ");

            if line.is_empty() {
                continue;
            }

            out.push_str(&line);
            out.push('\n');
        }

        Ok(out)
    }
}
