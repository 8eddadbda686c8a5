use crate::regex::Regex;

/// A partially built operator frame. Only concatenations, alternations and
/// the parenthesis sentinel ever live on the stack; the sentinel never
/// appears in a finished [Regex] tree because it is not a [Regex] variant in
/// the first place.
#[derive(Debug)]
enum Frame {
    Concat(Vec<Regex>),
    Alt(Vec<Regex>),
    Paren,
}

/// Errors the builder can detect; the parser wraps them with a line number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum BuildError {
    /// `)` with no matching `(`.
    UnbalancedClose,
    /// A quantifier with nothing to apply to.
    EmptyQuantifier,
    /// `{` starting an action while a group is still open.
    CodeInsideParens,
    /// `{` starting an action before any pattern was given.
    CodeWithoutRegex,
}

/// Incremental regex assembly: a "current" regex plus a stack of operator
/// frames, in the shunting-yard style. The parser feeds it one token's worth
/// of work at a time; [RegexBuilder::finish] collapses everything into the
/// rule's tree when the action block opens.
#[derive(Debug, Default)]
pub(super) struct RegexBuilder {
    current: Option<Regex>,
    stack: Vec<Frame>,
    group_depth: usize,
}

fn sequence(mut items: Vec<Regex>) -> Regex {
    if items.len() == 1 {
        items.remove(0)
    } else {
        Regex::Sequence(items)
    }
}

impl RegexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if no pattern has been started since the last [finish].
    ///
    /// [finish]: RegexBuilder::finish
    pub fn is_empty(&self) -> bool {
        self.current.is_none() && self.stack.is_empty()
    }

    /// Folds the pending current regex into the topmost frame: into an open
    /// concatenation if one is on top, otherwise into a fresh one.
    fn flush_current(&mut self) {
        if let Some(cur) = self.current.take() {
            match self.stack.last_mut() {
                Some(Frame::Concat(items)) => items.push(cur),
                _ => self.stack.push(Frame::Concat(vec![cur])),
            }
        }
    }

    /// Emits a simple atom: a literal, class, `.`, or a finished group's
    /// tree.
    pub fn atom(&mut self, rx: Regex) {
        self.flush_current();
        self.current = Some(rx);
    }

    /// `(` — flush the current regex like an atom would, then mark the group
    /// boundary.
    pub fn open_group(&mut self) {
        self.flush_current();
        self.stack.push(Frame::Paren);
        self.group_depth += 1;
    }

    /// `)` — pop frames down to and including the nearest sentinel,
    /// composing them into a single regex that becomes the new current.
    /// An alternation closed with a missing branch gets an explicit
    /// [Regex::Epsilon] child.
    pub fn close_group(&mut self) -> Result<(), BuildError> {
        if self.group_depth == 0 {
            return Err(BuildError::UnbalancedClose);
        }
        self.group_depth -= 1;

        let mut composed = self.current.take();
        loop {
            match self.stack.pop() {
                Some(Frame::Paren) => break,
                Some(Frame::Concat(mut items)) => {
                    if let Some(rx) = composed {
                        items.push(rx);
                    }
                    composed = Some(sequence(items));
                }
                Some(Frame::Alt(mut branches)) => {
                    branches.push(composed.unwrap_or(Regex::Epsilon));
                    composed = Some(Regex::Alt(branches));
                }
                None => return Err(BuildError::UnbalancedClose),
            }
        }
        self.current = composed;
        Ok(())
    }

    /// `|` — push the current regex (or [Regex::Epsilon] if there is none)
    /// as a finished branch of the nearest enclosing alternation, creating
    /// one if absent. An open concatenation is finalized into the
    /// alternation as one branch.
    pub fn alternate(&mut self) {
        let branch = self.current.take().unwrap_or(Regex::Epsilon);
        match self.stack.pop() {
            None => self.stack.push(Frame::Alt(vec![branch])),
            Some(Frame::Alt(mut branches)) => {
                branches.push(branch);
                self.stack.push(Frame::Alt(branches));
            }
            Some(Frame::Paren) => {
                self.stack.push(Frame::Paren);
                self.stack.push(Frame::Alt(vec![branch]));
            }
            Some(Frame::Concat(mut items)) => {
                if branch != Regex::Epsilon {
                    items.push(branch);
                }
                let seq = sequence(items);
                match self.stack.pop() {
                    Some(Frame::Alt(mut branches)) => {
                        branches.push(seq);
                        self.stack.push(Frame::Alt(branches));
                    }
                    other => {
                        if let Some(frame) = other {
                            self.stack.push(frame);
                        }
                        self.stack.push(Frame::Alt(vec![seq]));
                    }
                }
            }
        }
    }

    /// Applies a quantifier to the current regex.
    pub fn quantify(
        &mut self,
        wrap: impl FnOnce(Box<Regex>) -> Regex,
    ) -> Result<(), BuildError> {
        match self.current.take() {
            None => Err(BuildError::EmptyQuantifier),
            Some(cur) => {
                self.current = Some(wrap(Box::new(cur)));
                Ok(())
            }
        }
    }

    /// `{` opening the action block: collapses every remaining frame into
    /// the rule's finished tree and resets the builder.
    pub fn finish(&mut self) -> Result<Regex, BuildError> {
        if self.group_depth > 0 {
            return Err(BuildError::CodeInsideParens);
        }
        if self.is_empty() {
            return Err(BuildError::CodeWithoutRegex);
        }

        let mut composed = self.current.take();
        while let Some(frame) = self.stack.pop() {
            match frame {
                Frame::Paren => return Err(BuildError::CodeInsideParens),
                Frame::Concat(mut items) => {
                    if let Some(rx) = composed {
                        items.push(rx);
                    }
                    composed = Some(sequence(items));
                }
                Frame::Alt(mut branches) => {
                    branches.push(composed.unwrap_or(Regex::Epsilon));
                    composed = Some(Regex::Alt(branches));
                }
            }
        }
        composed.ok_or(BuildError::CodeWithoutRegex)
    }
}
