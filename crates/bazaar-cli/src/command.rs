//! Command line parsing.
//!
//! Tokens are separated by whitespace. Single quotes group words into one
//! token and are dropped; `''` is an explicit empty token.

use crate::error::DispatchError;

/// Split a command line into tokens.
#[must_use]
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut in_quotes = false;

    for c in line.trim().chars() {
        match c {
            '\'' => {
                in_quotes = !in_quotes;
                quoted = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if quoted || !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                quoted = false;
            }
            c => current.push(c),
        }
    }
    if quoted || !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// A parsed command. Arguments are kept as text until the user is
/// authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `REGISTER <username>`
    Register {
        /// New username.
        username: String,
    },
    /// `CREATE_LISTING <username> <title> <description> <price> <category>`
    CreateListing {
        /// Owner.
        username: String,
        /// Title.
        title: String,
        /// Description.
        description: String,
        /// Unparsed price.
        price: String,
        /// Category.
        category: String,
    },
    /// `GET_LISTING <username> <listing_id>`
    GetListing {
        /// Requesting user.
        username: String,
        /// Unparsed listing id.
        listing_id: String,
    },
    /// `GET_CATEGORY <username> <category> [<sort_key> <sort_order>]`
    GetCategory {
        /// Requesting user.
        username: String,
        /// Category to browse.
        category: String,
        /// Unparsed sort key and order.
        sort: Option<(String, String)>,
    },
    /// `GET_TOP_CATEGORY <username>`
    GetTopCategory {
        /// Requesting user.
        username: String,
    },
    /// `DELETE_LISTING <username> <listing_id>`
    DeleteListing {
        /// Requesting user.
        username: String,
        /// Unparsed listing id.
        listing_id: String,
    },
}

impl Command {
    /// Parse a line. Blank lines yield `None`.
    ///
    /// # Errors
    ///
    /// Returns `DispatchError::UnknownCommand` or
    /// `DispatchError::InvalidArguments`.
    pub fn parse(line: &str) -> Result<Option<Self>, DispatchError> {
        let mut tokens = tokenize(line).into_iter();
        let Some(name) = tokens.next() else {
            return Ok(None);
        };
        let args: Vec<String> = tokens.collect();

        let command = match (name.as_str(), args.len()) {
            ("REGISTER", 1) => {
                let [username] = take(args)?;
                Self::Register { username }
            }
            ("CREATE_LISTING", 5) => {
                let [username, title, description, price, category] = take(args)?;
                Self::CreateListing {
                    username,
                    title,
                    description,
                    price,
                    category,
                }
            }
            ("GET_LISTING", 2) => {
                let [username, listing_id] = take(args)?;
                Self::GetListing {
                    username,
                    listing_id,
                }
            }
            ("GET_CATEGORY", 2) => {
                let [username, category] = take(args)?;
                Self::GetCategory {
                    username,
                    category,
                    sort: None,
                }
            }
            ("GET_CATEGORY", 4) => {
                let [username, category, sort_key, sort_order] = take(args)?;
                Self::GetCategory {
                    username,
                    category,
                    sort: Some((sort_key, sort_order)),
                }
            }
            ("GET_TOP_CATEGORY", 1) => {
                let [username] = take(args)?;
                Self::GetTopCategory { username }
            }
            ("DELETE_LISTING", 2) => {
                let [username, listing_id] = take(args)?;
                Self::DeleteListing {
                    username,
                    listing_id,
                }
            }
            (
                "REGISTER" | "CREATE_LISTING" | "GET_LISTING" | "GET_CATEGORY"
                | "GET_TOP_CATEGORY" | "DELETE_LISTING",
                _,
            ) => return Err(DispatchError::InvalidArguments),
            _ => return Err(DispatchError::UnknownCommand(name)),
        };
        Ok(Some(command))
    }

    /// The username the command is issued as.
    #[must_use]
    pub fn username(&self) -> &str {
        match self {
            Self::Register { username }
            | Self::CreateListing { username, .. }
            | Self::GetListing { username, .. }
            | Self::GetCategory { username, .. }
            | Self::GetTopCategory { username }
            | Self::DeleteListing { username, .. } => username,
        }
    }

    /// Whether the username must already be registered.
    #[must_use]
    pub const fn requires_user(&self) -> bool {
        !matches!(self, Self::Register { .. })
    }
}

fn take<const N: usize>(args: Vec<String>) -> Result<[String; N], DispatchError> {
    args.try_into().map_err(|_| DispatchError::InvalidArguments)
}
