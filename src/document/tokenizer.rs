/*!
 * Byte-preserving HTML tokenizer.
 *
 * Every token borrows its exact source bytes, so concatenating the `raw()` of
 * all tokens reproduces the input. Every delimiter is ASCII, so documents in
 * any ASCII-compatible encoding pass through untouched. Start tags are split into attributes;
 * everything else (text, comments, declarations, end tags and the content of
 * raw-text elements such as `script`) is only delimited, never interpreted.
 */

use std::borrow::Cow;

/// Elements whose content is not markup
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "textarea", "title", "xmp", "iframe", "noembed", "noframes", "noscript",
];

/// One attribute of a start tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute<'a> {
    /// Name as written
    pub name: &'a [u8],
    /// Value without quotes, entities left as written
    pub value: Option<&'a [u8]>,
    /// Source bytes from the first name byte to the end of the value
    pub raw: &'a [u8],
}

impl<'a> Attribute<'a> {
    /// ASCII case-insensitive name comparison
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name.as_bytes())
    }

    /// Value decoded as UTF-8, invalid sequences replaced
    pub fn value_text(&self) -> Option<Cow<'a, str>> {
        self.value.map(String::from_utf8_lossy)
    }
}

/// A start tag with its attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTag<'a> {
    pub raw: &'a [u8],
    pub name: &'a [u8],
    pub attributes: Vec<Attribute<'a>>,
    /// Ends in `/>`
    pub self_closing: bool,
}

impl StartTag<'_> {
    /// `img` or `image`, any case
    pub fn is_image(&self) -> bool {
        self.name.eq_ignore_ascii_case(b"img") || self.name.eq_ignore_ascii_case(b"image")
    }
}

/// A slice of the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    Text(&'a [u8]),
    /// `<!-- ... -->`
    Comment(&'a [u8]),
    /// `<!DOCTYPE ...>`, `<![CDATA[ ... ]]>` and `<? ... >`
    Declaration(&'a [u8]),
    StartTag(StartTag<'a>),
    EndTag { raw: &'a [u8], name: &'a [u8] },
    /// Content of a raw-text element
    RawText(&'a [u8]),
}

impl<'a> Token<'a> {
    /// Exact source bytes of the token
    pub fn raw(&self) -> &'a [u8] {
        match self {
            Token::Text(raw) | Token::Comment(raw) | Token::Declaration(raw) | Token::RawText(raw) => raw,
            Token::StartTag(tag) => tag.raw,
            Token::EndTag { raw, .. } => raw,
        }
    }
}

/// A construct that never terminates before the end of input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizeError {
    /// Byte offset where the construct starts
    pub offset: usize,
    /// What was left open
    pub reason: &'static str,
}

impl std::fmt::Display for TokenizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at byte {}", self.reason, self.offset)
    }
}

impl std::error::Error for TokenizeError {}

/// Iterator over the tokens of an HTML document
///
/// After the first error the iterator is fused and yields nothing more.
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    input: &'a [u8],
    pos: usize,
    /// Raw-text element whose content comes next
    raw_text_element: Option<&'static str>,
    failed: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new<T: AsRef<[u8]> + ?Sized>(input: &'a T) -> Self {
        Self {
            input: input.as_ref(),
            pos: 0,
            raw_text_element: None,
            failed: false,
        }
    }

    fn bytes(&self) -> &'a [u8] {
        self.input
    }

    fn starts_with_at(&self, at: usize, pattern: &str) -> bool {
        self.bytes()
            .get(at..at + pattern.len())
            .is_some_and(|b| b.eq_ignore_ascii_case(pattern.as_bytes()))
    }

    fn find_from(&self, at: usize, pattern: &str) -> Option<usize> {
        let needle = pattern.as_bytes();
        self.bytes()
            .get(at..)?
            .windows(needle.len())
            .position(|window| window == needle)
            .map(|i| at + i)
    }

    /// Emit `input[start..end]` and move past it
    fn take(&mut self, end: usize) -> &'a [u8] {
        let start = self.pos;
        self.pos = end;
        &self.input[start..end]
    }

    fn fail(&mut self, offset: usize, reason: &'static str) -> Option<Result<Token<'a>, TokenizeError>> {
        self.failed = true;
        Some(Err(TokenizeError { offset, reason }))
    }

    /// Position of the `</name` that closes the current raw-text element
    fn find_raw_text_end(&self, name: &str) -> Option<usize> {
        let bytes = self.bytes();
        let mut at = self.pos;

        while let Some(idx) = self.find_from(at, "</") {
            let after_name = idx + 2 + name.len();
            if self.starts_with_at(idx + 2, name)
                && bytes
                    .get(after_name)
                    .is_none_or(|&b| b == b'>' || b == b'/' || b.is_ascii_whitespace())
            {
                return Some(idx);
            }
            at = idx + 2;
        }

        None
    }

    fn next_raw_text(&mut self, name: &'static str) -> Option<Token<'a>> {
        self.raw_text_element = None;

        let end = self.find_raw_text_end(name).unwrap_or(self.input.len());
        if end == self.pos {
            return None;
        }

        Some(Token::RawText(self.take(end)))
    }

    fn next_text(&mut self) -> Token<'a> {
        let end = self.find_from(self.pos + 1, "<").unwrap_or(self.input.len());
        Token::Text(self.take(end))
    }

    fn next_markup(&mut self) -> Option<Result<Token<'a>, TokenizeError>> {
        let start = self.pos;
        let input = self.input;
        let bytes = self.bytes();

        if self.starts_with_at(start, "<!--") {
            // Searching from `<!` also accepts the abrupt `<!-->` and `<!--->` forms
            return match self.find_from(start + 2, "-->") {
                Some(end) => Some(Ok(Token::Comment(self.take(end + 3)))),
                None => self.fail(start, "unterminated comment"),
            };
        }

        if self.starts_with_at(start, "<![CDATA[") {
            return match self.find_from(start + 9, "]]>") {
                Some(end) => Some(Ok(Token::Declaration(self.take(end + 3)))),
                None => self.fail(start, "unterminated CDATA section"),
            };
        }

        if self.starts_with_at(start, "<!") || self.starts_with_at(start, "<?") {
            return match self.find_from(start + 2, ">") {
                Some(end) => Some(Ok(Token::Declaration(self.take(end + 1)))),
                None => self.fail(start, "unterminated declaration"),
            };
        }

        if self.starts_with_at(start, "</") && bytes.get(start + 2).is_some_and(u8::is_ascii_alphabetic) {
            let name_end = self.scan_name(start + 2);
            return match self.find_from(name_end, ">") {
                Some(end) => {
                    let name = &input[start + 2..name_end];
                    let raw = self.take(end + 1);
                    Some(Ok(Token::EndTag { raw, name }))
                }
                None => self.fail(start, "unterminated end tag"),
            };
        }

        if bytes.get(start + 1).is_some_and(u8::is_ascii_alphabetic) {
            return Some(self.next_start_tag());
        }

        // A `<` that opens nothing is text
        Some(Ok(self.next_text()))
    }

    /// End of a tag name starting at `at`
    fn scan_name(&self, mut at: usize) -> usize {
        let bytes = self.bytes();
        while let Some(&b) = bytes.get(at) {
            if b.is_ascii_whitespace() || b == b'/' || b == b'>' {
                break;
            }
            at += 1;
        }
        at
    }

    fn skip_whitespace(&self, mut at: usize) -> usize {
        let bytes = self.bytes();
        while bytes.get(at).is_some_and(u8::is_ascii_whitespace) {
            at += 1;
        }
        at
    }

    fn next_start_tag(&mut self) -> Result<Token<'a>, TokenizeError> {
        let start = self.pos;
        let input = self.input;
        let bytes = self.bytes();
        let name_end = self.scan_name(start + 1);
        let name = &input[start + 1..name_end];

        let mut attributes = Vec::new();
        let mut at = name_end;

        let self_closing = loop {
            at = self.skip_whitespace(at);

            match bytes.get(at) {
                None => {
                    return Err(TokenizeError {
                        offset: start,
                        reason: "unterminated tag",
                    });
                }
                Some(b'>') => break false,
                Some(b'/') if bytes.get(at + 1) == Some(&b'>') => {
                    at += 1;
                    break true;
                }
                Some(b'/') => {
                    at += 1;
                    continue;
                }
                Some(_) => {}
            }

            let (attribute, end) = self.scan_attribute(at)?;
            attributes.push(attribute);
            at = end;
        };

        let raw = self.take(at + 1);

        // A trailing slash on a non-void element is ignored, so `<script/>` still opens raw text
        self.raw_text_element = RAW_TEXT_ELEMENTS
            .iter()
            .find(|element| name.eq_ignore_ascii_case(element.as_bytes()))
            .copied();

        Ok(Token::StartTag(StartTag {
            raw,
            name,
            attributes,
            self_closing,
        }))
    }

    /// Attribute starting at `start`; returns it and the offset after it
    fn scan_attribute(&self, start: usize) -> Result<(Attribute<'a>, usize), TokenizeError> {
        let bytes = self.bytes();

        // The first character may be `=`, per the HTML attribute-name state
        let mut at = start + 1;
        while let Some(&b) = bytes.get(at) {
            if b.is_ascii_whitespace() || b == b'/' || b == b'>' || b == b'=' {
                break;
            }
            at += 1;
        }
        let name = &self.input[start..at];

        let after_space = self.skip_whitespace(at);
        if bytes.get(after_space) != Some(&b'=') {
            let attribute = Attribute {
                name,
                value: None,
                raw: name,
            };
            return Ok((attribute, at));
        }

        let value_start = self.skip_whitespace(after_space + 1);
        let (value, end) = match bytes.get(value_start) {
            Some(&quote @ (b'"' | b'\'')) => {
                let close = self
                    .find_from(value_start + 1, if quote == b'"' { "\"" } else { "'" })
                    .ok_or(TokenizeError {
                        offset: value_start,
                        reason: "unterminated attribute value",
                    })?;
                (&self.input[value_start + 1..close], close + 1)
            }
            Some(_) => {
                let mut end = value_start;
                while let Some(&b) = bytes.get(end) {
                    if b.is_ascii_whitespace() || b == b'>' {
                        break;
                    }
                    end += 1;
                }
                (&self.input[value_start..end], end)
            }
            None => {
                return Err(TokenizeError {
                    offset: self.pos,
                    reason: "unterminated tag",
                });
            }
        };

        let attribute = Attribute {
            name,
            value: Some(value),
            raw: &self.input[start..end],
        };
        Ok((attribute, end))
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Result<Token<'a>, TokenizeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        if let Some(name) = self.raw_text_element {
            if let Some(token) = self.next_raw_text(name) {
                return Some(Ok(token));
            }
        }

        if self.pos >= self.input.len() {
            return None;
        }

        if self.bytes()[self.pos] == b'<' {
            return match self.next_markup() {
                Some(Err(e)) => {
                    self.failed = true;
                    Some(Err(e))
                }
                other => other,
            };
        }

        Some(Ok(self.next_text()))
    }
}
