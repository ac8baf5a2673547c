//! core::args
//!
//! Ordered command-line argument lists.
//!
//! # Design
//!
//! An [`Arguments`] list is built by applying [`Argument`] values in
//! sequence. Two insertion modes exist:
//!
//! - [`Arguments::add`] appends unconditionally (positionals, repeatable flags)
//! - [`Arguments::add_or_replace`] first removes every earlier occurrence of
//!   the same flag, then appends, so later and more specific options
//!   override earlier defaults
//!
//! Flags carry their value inline (`--size=10g`), so a flag is always a
//! single token and replacing it never leaves a dangling value behind.
//!
//! # Example
//!
//! ```
//! use lvmkit::core::args::Arguments;
//!
//! let mut args = Arguments::new();
//! args.add_or_replace("--size=10g");
//! args.add("vg0");
//! args.add_or_replace("--size=20g");
//! assert_eq!(args.as_slice(), ["vg0", "--size=20g"]);
//! ```

/// A value that knows how to render itself into an argument list.
///
/// Rendering must be deterministic: applying the same value to equal
/// argument lists yields equal lists.
pub trait Argument {
    /// Render this value into `args`.
    fn apply_to_args(&self, args: &mut Arguments);
}

impl<T: Argument> Argument for Option<T> {
    fn apply_to_args(&self, args: &mut Arguments) {
        if let Some(inner) = self {
            inner.apply_to_args(args);
        }
    }
}

impl<T: Argument + ?Sized> Argument for &T {
    fn apply_to_args(&self, args: &mut Arguments) {
        (**self).apply_to_args(args);
    }
}

/// Ordered sequence of command-line tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments {
    raw: Vec<String>,
}

impl Arguments {
    /// Create an empty argument list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a token.
    pub fn add(&mut self, token: impl Into<String>) {
        self.raw.push(token.into());
    }

    /// Append several tokens in order.
    pub fn extend<I, S>(&mut self, tokens: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.raw.extend(tokens.into_iter().map(Into::into));
    }

    /// Remove prior occurrences of the token's flag, then append it.
    ///
    /// For flags (tokens starting with `-`) the flag name is everything
    /// before the first `=`. Positional tokens only replace exact
    /// duplicates.
    pub fn add_or_replace(&mut self, token: impl Into<String>) {
        let token = token.into();
        let key = flag_key(&token).to_string();
        self.raw.retain(|existing| flag_key(existing) != key);
        self.raw.push(token);
    }

    /// Remove every occurrence of a flag, whatever its value.
    pub fn remove_flag(&mut self, flag: &str) {
        self.raw.retain(|existing| flag_key(existing) != flag);
    }

    /// Whether a flag is present, with or without a value.
    pub fn contains_flag(&self, flag: &str) -> bool {
        self.raw.iter().any(|existing| flag_key(existing) == flag)
    }

    /// Apply an [`Argument`] to this list.
    pub fn apply(&mut self, argument: &dyn Argument) -> &mut Self {
        argument.apply_to_args(self);
        self
    }

    /// The tokens in order.
    pub fn as_slice(&self) -> &[String] {
        &self.raw
    }

    /// Consume the list, returning its tokens.
    pub fn into_vec(self) -> Vec<String> {
        self.raw
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

impl From<Vec<String>> for Arguments {
    fn from(raw: Vec<String>) -> Self {
        Self { raw }
    }
}

impl IntoIterator for Arguments {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.raw.into_iter()
    }
}

impl std::fmt::Display for Arguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw.join(" "))
    }
}

/// The part of a token that identifies it for replacement.
fn flag_key(token: &str) -> &str {
    if token.starts_with('-') {
        token.split_once('=').map_or(token, |(flag, _)| flag)
    } else {
        token
    }
}
