//! MDX compatibility shims.
//!
//! MDX allows ESM `import`/`export` statements at the top level of a document.
//! They carry no renderable content, so they are removed before the markdown
//! parser sees them. An ESM block runs until the next blank line, matching
//! how MDX itself delimits them. Lines inside fenced code are never touched.

pub(crate) fn strip_esm(markdown: &str) -> String {
    let mut output = String::with_capacity(markdown.len());
    let mut fence: Option<Fence> = None;
    let mut in_esm = false;

    for line in markdown.split_inclusive('\n') {
        let content = line.trim_end_matches(['\n', '\r']);

        if let Some(open) = &fence {
            if open.is_closed_by(content) {
                fence = None;
            }
            output.push_str(line);
            continue;
        }

        if in_esm {
            if content.trim().is_empty() {
                in_esm = false;
                output.push_str(line);
            }
            continue;
        }

        if is_esm_start(content) {
            in_esm = true;
            continue;
        }

        fence = Fence::open(content);
        output.push_str(line);
    }

    output
}

fn is_esm_start(line: &str) -> bool {
    // ESM must start at column zero; indented text is paragraph content.
    ["import ", "import{", "export "]
        .iter()
        .any(|keyword| line.starts_with(keyword))
}

struct Fence {
    marker: char,
    len: usize,
}

impl Fence {
    fn open(line: &str) -> Option<Self> {
        let trimmed = line.trim_start_matches(' ');
        if line.len() - trimmed.len() > 3 {
            return None;
        }
        let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
        let len = trimmed.chars().take_while(|c| *c == marker).count();
        if len < 3 {
            return None;
        }
        // Backtick fences cannot have backticks in their info string.
        if marker == '`' && trimmed[len..].contains('`') {
            return None;
        }
        Some(Self { marker, len })
    }

    fn is_closed_by(&self, line: &str) -> bool {
        let trimmed = line.trim_start_matches(' ');
        if line.len() - trimmed.len() > 3 {
            return false;
        }
        let count = trimmed.chars().take_while(|c| *c == self.marker).count();
        count >= self.len && trimmed[count..].trim().is_empty()
    }
}
