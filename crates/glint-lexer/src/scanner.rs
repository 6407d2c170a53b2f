use crate::event::{is_void_element, Attribute, Event, EventKind, Span};
use crate::LexerError;

/// Scanner mode determines which top-level content is legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannerMode {
    /// Default mode: any number of top-level elements and text runs.
    Fragment,
    /// Source starts with a doctype: text outside elements must be whitespace.
    Document,
}

/// An element that has been opened but not yet closed.
struct OpenElement {
    name: String,
    line: usize,
    column: usize,
}

/// glint markup scanner.
///
/// Turns template source into a flat list of events, one pass, no lookbehind:
/// - `Vec<char>` source for index-based navigation
/// - a stack of open elements to validate close tags
/// - position tracking on every event
pub struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    events: Vec<Event>,
    open: Vec<OpenElement>,
    mode: ScannerMode,
}

impl Scanner {
    /// Create a new scanner, choosing the mode from the source itself.
    pub fn new(source: &str) -> Self {
        Self::with_mode(source, Self::detect_mode(source))
    }

    /// Create a scanner with a specific mode.
    pub fn with_mode(source: &str, mode: ScannerMode) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            events: Vec::new(),
            open: Vec::new(),
            mode,
        }
    }

    /// Document mode if the source starts with a doctype declaration.
    pub fn detect_mode(source: &str) -> ScannerMode {
        let head: String = source.trim_start().chars().take(9).collect();
        if head.eq_ignore_ascii_case("<!doctype") {
            ScannerMode::Document
        } else {
            ScannerMode::Fragment
        }
    }

    /// Scan the entire source into a vector of events.
    pub fn scan(source: &str) -> Result<Vec<Event>, LexerError> {
        let mut scanner = Scanner::new(source);
        scanner.scan_events()?;
        Ok(scanner.events)
    }

    pub fn mode(&self) -> ScannerMode {
        self.mode
    }

    fn scan_events(&mut self) -> Result<(), LexerError> {
        tracing::trace!(mode = ?self.mode, chars = self.chars.len(), "scanning markup");

        while !self.is_at_end() {
            if self.peek() == '<' && self.starts_markup() {
                self.scan_markup()?;
            } else {
                self.scan_text()?;
            }
        }

        if let Some(unclosed) = self.open.last() {
            return Err(LexerError {
                message: format!("Unclosed tag <{}>", unclosed.name),
                line: unclosed.line,
                column: unclosed.column,
            });
        }
        Ok(())
    }

    /// Whether the `<` under the cursor opens markup rather than being literal text.
    fn starts_markup(&self) -> bool {
        matches!(self.peek_next(), '/' | '!' | '?' | '>') || self.peek_next().is_ascii_alphabetic()
    }

    fn scan_markup(&mut self) -> Result<(), LexerError> {
        if self.starts_with("<!--") {
            self.scan_comment()
        } else if self.starts_with_ignore_case("<!doctype") {
            self.scan_doctype()
        } else if self.peek_next() == '!' {
            Err(self.error("Unsupported markup declaration".into()))
        } else if self.peek_next() == '?' {
            self.skip_processing_instruction()
        } else if self.peek_next() == '/' {
            self.scan_close_tag()
        } else {
            self.scan_open_tag()
        }
    }

    // --- Scanners ---

    /// Scan character data up to the next markup.
    fn scan_text(&mut self) -> Result<(), LexerError> {
        let (start, line, column) = (self.pos, self.line, self.column);
        let mut text = String::new();

        // The first char is consumed unconditionally: it is either text or a literal `<`.
        text.push(self.peek());
        self.advance();
        while !self.is_at_end() && !(self.peek() == '<' && self.starts_markup()) {
            text.push(self.peek());
            self.advance();
        }

        if self.mode == ScannerMode::Document
            && self.open.is_empty()
            && !text.trim().is_empty()
        {
            return Err(LexerError {
                message: "Text outside the root element".into(),
                line,
                column,
            });
        }

        self.events.push(Event::new(
            EventKind::Text(text),
            Span::new(start, self.pos, line, column),
        ));
        Ok(())
    }

    /// Scan `<!-- ... -->`.
    fn scan_comment(&mut self) -> Result<(), LexerError> {
        let (start, line, column) = (self.pos, self.line, self.column);
        self.advance_n(4); // `<!--`

        let mut content = String::new();
        while !self.starts_with("-->") {
            if self.is_at_end() {
                return Err(LexerError {
                    message: "Unterminated comment".into(),
                    line,
                    column,
                });
            }
            content.push(self.peek());
            self.advance();
        }
        self.advance_n(3); // `-->`

        self.events.push(Event::new(
            EventKind::Comment(content),
            Span::new(start, self.pos, line, column),
        ));
        Ok(())
    }

    /// Scan `<!DOCTYPE ...>`, keeping the text after the keyword.
    fn scan_doctype(&mut self) -> Result<(), LexerError> {
        let (start, line, column) = (self.pos, self.line, self.column);
        self.advance_n(9); // `<!DOCTYPE`

        let mut content = String::new();
        while self.peek() != '>' {
            if self.is_at_end() {
                return Err(LexerError {
                    message: "Unterminated doctype".into(),
                    line,
                    column,
                });
            }
            content.push(self.peek());
            self.advance();
        }
        self.advance(); // `>`

        self.events.push(Event::new(
            EventKind::Doctype(content),
            Span::new(start, self.pos, line, column),
        ));
        Ok(())
    }

    fn skip_processing_instruction(&mut self) -> Result<(), LexerError> {
        let (line, column) = (self.line, self.column);
        while !self.starts_with("?>") {
            if self.is_at_end() {
                return Err(LexerError {
                    message: "Unterminated processing instruction".into(),
                    line,
                    column,
                });
            }
            self.advance();
        }
        self.advance_n(2);
        Ok(())
    }

    /// Scan `<name attr="value" ...>` or `<name .../>`. `<>` opens a nameless tag.
    fn scan_open_tag(&mut self) -> Result<(), LexerError> {
        let (start, line, column) = (self.pos, self.line, self.column);
        self.advance(); // `<`

        let name = self.scan_name();
        self.events.push(Event::new(
            EventKind::OpenTagStart(name.clone()),
            Span::new(start, self.pos, line, column),
        ));

        let mut attributes = Vec::new();
        let self_closing = loop {
            self.skip_whitespace();
            if self.is_at_end() {
                return Err(LexerError {
                    message: format!("Unterminated tag <{name}>"),
                    line,
                    column,
                });
            }
            match self.peek() {
                '>' => {
                    self.advance();
                    break false;
                }
                '/' if self.peek_next() == '>' => {
                    self.advance_n(2);
                    break true;
                }
                _ => {
                    let attribute = self.scan_attribute()?;
                    self.events.push(Event::new(
                        EventKind::Attribute(attribute.clone()),
                        attribute.span,
                    ));
                    attributes.push(attribute);
                }
            }
        };

        let span = Span::new(start, self.pos, line, column);
        let auto_close = self_closing || is_void_element(&name);
        self.events.push(Event::new(
            EventKind::OpenTag {
                name: name.clone(),
                attributes,
                self_closing,
            },
            span,
        ));

        if auto_close {
            self.events.push(Event::new(EventKind::CloseTag(name), span));
        } else {
            self.open.push(OpenElement { name, line, column });
        }
        Ok(())
    }

    /// Scan one `name`, `name=value`, `name="value"` or `name='value'`.
    fn scan_attribute(&mut self) -> Result<Attribute, LexerError> {
        let (start, line, column) = (self.pos, self.line, self.column);

        let mut name = String::new();
        while !self.is_at_end()
            && !self.peek().is_whitespace()
            && !matches!(self.peek(), '=' | '>' | '/' | '"' | '\'')
        {
            name.push(self.peek());
            self.advance();
        }
        if name.is_empty() {
            return Err(self.error(format!("Unexpected character in tag: '{}'", self.peek())));
        }

        self.skip_whitespace();
        let value = if self.peek() == '=' {
            self.advance();
            self.skip_whitespace();
            self.scan_attribute_value(&name)?
        } else {
            String::new()
        };

        Ok(Attribute {
            name,
            value,
            span: Span::new(start, self.pos, line, column),
        })
    }

    fn scan_attribute_value(&mut self, name: &str) -> Result<String, LexerError> {
        let (line, column) = (self.line, self.column);
        let mut value = String::new();

        match self.peek() {
            quote @ ('"' | '\'') => {
                self.advance(); // opening quote
                while self.peek() != quote {
                    if self.is_at_end() {
                        return Err(LexerError {
                            message: format!("Unterminated value for attribute \"{name}\""),
                            line,
                            column,
                        });
                    }
                    value.push(self.peek());
                    self.advance();
                }
                self.advance(); // closing quote
            }
            _ => {
                while !self.is_at_end() && !self.peek().is_whitespace() && self.peek() != '>' {
                    value.push(self.peek());
                    self.advance();
                }
            }
        }
        Ok(value)
    }

    /// Scan `</name>`, checking it closes the innermost open element.
    fn scan_close_tag(&mut self) -> Result<(), LexerError> {
        let (start, line, column) = (self.pos, self.line, self.column);
        self.advance_n(2); // `</`

        let name = self.scan_name();
        self.skip_whitespace();
        if self.peek() != '>' {
            return Err(self.error(format!("Expected '>' to close </{name}")));
        }
        self.advance();

        // `<br></br>`: the void element was already closed when it was opened
        let closes_void = is_void_element(&name)
            && matches!(self.events.last(), Some(Event { kind: EventKind::CloseTag(last), .. }) if *last == name);
        if closes_void {
            return Ok(());
        }

        match self.open.pop() {
            Some(open) if open.name == name => {}
            Some(open) => {
                return Err(LexerError {
                    message: format!(
                        "Mismatched closing tag </{name}>, expected </{}>",
                        open.name
                    ),
                    line,
                    column,
                });
            }
            None => {
                return Err(LexerError {
                    message: format!("Unexpected closing tag </{name}>"),
                    line,
                    column,
                });
            }
        }

        self.events.push(Event::new(
            EventKind::CloseTag(name),
            Span::new(start, self.pos, line, column),
        ));
        Ok(())
    }

    fn scan_name(&mut self) -> String {
        let mut name = String::new();
        while !self.is_at_end()
            && (self.peek().is_alphanumeric() || matches!(self.peek(), '-' | '_' | ':' | '.'))
        {
            name.push(self.peek());
            self.advance();
        }
        name
    }

    // --- Helpers ---

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.chars[self.pos]
        }
    }

    fn peek_next(&self) -> char {
        if self.pos + 1 >= self.chars.len() {
            '\0'
        } else {
            self.chars[self.pos + 1]
        }
    }

    fn starts_with(&self, pattern: &str) -> bool {
        pattern
            .chars()
            .enumerate()
            .all(|(i, c)| self.chars.get(self.pos + i) == Some(&c))
    }

    fn starts_with_ignore_case(&self, pattern: &str) -> bool {
        pattern.chars().enumerate().all(|(i, c)| {
            self.chars
                .get(self.pos + i)
                .is_some_and(|s| s.eq_ignore_ascii_case(&c))
        })
    }

    fn advance(&mut self) {
        if self.is_at_end() {
            return;
        }
        if self.chars[self.pos] == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.pos += 1;
    }

    fn advance_n(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() && self.peek().is_whitespace() {
            self.advance();
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn error(&self, message: String) -> LexerError {
        LexerError {
            message,
            line: self.line,
            column: self.column,
        }
    }
}
