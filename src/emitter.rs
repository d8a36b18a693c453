//! Line-oriented text buffer with scoped indentation.
//!
//! Derived emitters share the underlying buffer, so nested blocks can be
//! written through a deeper-indented handle without string concatenation.
//! Indentation is tabs, inserted once at the start of each line that
//! receives content.

use std::cell::RefCell;
use std::rc::Rc;

pub struct IndentBuffer {
    indent: usize,
    buf: Rc<RefCell<String>>,
    at_line_start: bool,
}

impl IndentBuffer {
    pub fn new(indent: usize) -> Self {
        IndentBuffer {
            indent,
            buf: Rc::new(RefCell::new(String::new())),
            at_line_start: true,
        }
    }

    /// A new emitter over the same buffer, indented `add` levels deeper.
    pub fn derive(&self, add: usize) -> Self {
        IndentBuffer {
            indent: self.indent + add,
            buf: Rc::clone(&self.buf),
            at_line_start: true,
        }
    }

    pub fn contents(&self) -> String {
        self.buf.borrow().clone()
    }

    fn tab(&mut self) {
        if self.at_line_start {
            let mut buf = self.buf.borrow_mut();
            for _ in 0..self.indent {
                buf.push('\t');
            }
            self.at_line_start = false;
        }
    }

    pub fn write_str(&mut self, s: &str) {
        for segment in s.split_inclusive('\n') {
            self.tab();
            self.buf.borrow_mut().push_str(segment);
            if segment.ends_with('\n') {
                self.at_line_start = true;
            }
        }
    }

    pub fn write_byte(&mut self, b: u8) {
        if b == b'\n' {
            self.new_line(1);
            return;
        }
        self.tab();
        self.buf.borrow_mut().push(b as char);
    }

    /// At least one newline is always written.
    pub fn new_line(&mut self, n: usize) {
        let n = n.max(1);
        let mut buf = self.buf.borrow_mut();
        for _ in 0..n {
            buf.push('\n');
        }
        drop(buf);
        self.at_line_start = true;
    }

    pub fn write_line(&mut self, s: &str) {
        self.write_str(s.trim_end_matches('\n'));
        self.new_line(1);
    }
}

#[cfg(test)]
#[path = "tests/t_emitter.rs"]
mod t_emitter;
