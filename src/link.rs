//! Parsing of `t.me` message links and message-id ranges.

/// A chat addressed either by public handle or by Bot-API numeric id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatRef {
    Handle(String),
    Id(i64),
}

impl std::fmt::Display for ChatRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatRef::Handle(name) => write!(f, "@{name}"),
            ChatRef::Id(id) => write!(f, "{id}"),
        }
    }
}

/// A single message pinpointed by a `t.me` link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageLink {
    pub chat: ChatRef,
    pub message_id: i32,
}

/// An inclusive range of message ids, normalized so `first <= last`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRange {
    first: i32,
    last: i32,
}

impl MessageRange {
    pub fn new(a: i32, b: i32) -> Self {
        if a <= b {
            Self { first: a, last: b }
        } else {
            Self { first: b, last: a }
        }
    }

    pub fn first(&self) -> i32 {
        self.first
    }

    pub fn last(&self) -> i32 {
        self.last
    }

    pub fn len(&self) -> u64 {
        (self.last - self.first) as u64 + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Parses a `t.me` message link.
///
/// Accepted shapes, with or without an `http(s)://` prefix:
/// - `t.me/<username>/<id>` for public chats
/// - `t.me/c/<digits>/<id>` for private channels; the Bot-API chat id is
///   `-100` concatenated with the digits (`1234567` -> `-1001234567`)
///
/// A trailing query string (`?single`, `?comment=...`) is ignored and a
/// grouped-message suffix on the id segment (`89-92`) keeps the leading id.
/// Anything else returns `None`.
pub fn parse_message_link(input: &str) -> Option<MessageLink> {
    let rest = input.trim();
    let rest = rest
        .strip_prefix("https://")
        .or_else(|| rest.strip_prefix("http://"))
        .unwrap_or(rest);
    let rest = rest.strip_prefix("t.me/")?;
    let rest = rest.split('?').next().unwrap_or(rest);

    let mut segments = rest.trim_end_matches('/').split('/');
    let head = segments.next()?;

    let link = if head == "c" {
        let digits = segments.next()?;
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let chat_id: i64 = format!("-100{digits}").parse().ok()?;
        MessageLink {
            chat: ChatRef::Id(chat_id),
            message_id: parse_id_segment(segments.next()?)?,
        }
    } else {
        if head.is_empty()
            || !head
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return None;
        }
        MessageLink {
            chat: ChatRef::Handle(head.to_string()),
            message_id: parse_id_segment(segments.next()?)?,
        }
    };

    if segments.next().is_some() {
        return None;
    }
    Some(link)
}

/// Parses `"A-B"` or `"N"` into a normalized range. Fails closed: malformed
/// input yields `None`, never a partial range.
pub fn parse_range(input: &str) -> Option<MessageRange> {
    let s = input.trim();
    if let Some((a, b)) = s.split_once('-') {
        Some(MessageRange::new(parse_id(a)?, parse_id(b)?))
    } else {
        let n = parse_id(s)?;
        Some(MessageRange::new(n, n))
    }
}

fn parse_id_segment(segment: &str) -> Option<i32> {
    // Grouped messages link as "89-92"; the first id is the one we fetch.
    parse_id(segment.split('-').next()?)
}

fn parse_id(s: &str) -> Option<i32> {
    let s = s.trim();
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse().ok().filter(|id| *id > 0)
}
