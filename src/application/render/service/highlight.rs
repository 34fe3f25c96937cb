use syntect::{
    html::{ClassStyle, ClassedHTMLGenerator},
    parsing::{SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
};

use crate::application::render::types::RenderError;

use super::escape_attribute;

/// Highlight a fenced code block into a `<pre><code>` fragment whose spans
/// carry `syntax-` prefixed classes. Unknown languages render as plain text.
pub(crate) fn highlight_code(
    language: Option<&str>,
    meta: Option<&str>,
    code: &str,
    syntax_set: &SyntaxSet,
    class_style: ClassStyle,
) -> Result<String, RenderError> {
    let language = language
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "text".to_string());
    let syntax =
        find_syntax(syntax_set, &language).unwrap_or_else(|| syntax_set.find_syntax_plain_text());

    let mut generator = ClassedHTMLGenerator::new_with_class_style(syntax, syntax_set, class_style);
    let source = if code.ends_with('\n') {
        code.to_string()
    } else {
        format!("{code}\n")
    };
    for line in LinesWithEndings::from(source.as_str()) {
        generator
            .parse_html_for_line_which_includes_newline(line)
            .map_err(|err| RenderError::Highlighting {
                language: language.clone(),
                message: err.to_string(),
            })?;
    }
    let highlighted = generator.finalize();

    let language_attr = escape_attribute(&language);
    let meta_attr = meta
        .filter(|meta| !meta.is_empty())
        .map(|meta| format!(" data-meta=\"{}\"", escape_attribute(meta)))
        .unwrap_or_default();

    Ok(format!(
        "<pre class=\"syntax-highlight\" data-language=\"{language_attr}\"><code class=\"language-{language_attr}\"{meta_attr}>{highlighted}</code></pre>"
    ))
}

fn find_syntax<'a>(syntax_set: &'a SyntaxSet, token: &str) -> Option<&'a SyntaxReference> {
    syntax_set
        .find_syntax_by_token(token)
        .or_else(|| syntax_set.find_syntax_by_extension(token))
}
