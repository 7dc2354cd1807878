//! Minimal XML scanning for SAML messages.
//!
//! Elements are located by local name so that any namespace prefix
//! (`samlp:`, `saml2:`, none) is accepted. This is not a validating parser.

/// A located element.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Element<'a> {
    /// The start tag text between `<` and `>`.
    tag: &'a str,
    /// Element content (empty for self-closing elements).
    pub content: &'a str,
    /// The whole element from `<` to the end of the close tag.
    pub outer: &'a str,
    /// Byte offset just past the element.
    pub end: usize,
}

impl<'a> Element<'a> {
    /// Returns an attribute value from the start tag.
    pub fn attribute(&self, name: &str) -> Option<String> {
        let name_end = self
            .tag
            .find(|c: char| c.is_whitespace() || c == '/')
            .unwrap_or(self.tag.len());
        let mut rest = &self.tag[name_end..];
        loop {
            rest = rest.trim_start();
            let eq = rest.find('=')?;
            let key = rest[..eq].trim();
            let value = rest[eq + 1..].trim_start();
            let quote = value.chars().next()?;
            if quote != '"' && quote != '\'' {
                return None;
            }
            let end = value[1..].find(quote)?;
            if key == name {
                return Some(unescape(&value[1..1 + end]));
            }
            rest = &value[end + 2..];
        }
    }

    /// Returns the trimmed, unescaped text content.
    pub fn text(&self) -> String {
        unescape(self.content.trim())
    }
}

/// Finds the first element with the given local name at or after `from`.
pub(crate) fn find_element<'a>(xml: &'a str, local_name: &str, from: usize) -> Option<Element<'a>> {
    let mut cursor = from;
    while let Some(rel) = xml.get(cursor..)?.find('<') {
        let start = cursor + rel;
        let after_lt = &xml[start + 1..];
        let name_len = after_lt
            .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
            .unwrap_or(after_lt.len());
        let qname = &after_lt[..name_len];
        let local = qname.rsplit(':').next().unwrap_or(qname);

        if local != local_name || qname.starts_with('/') || qname.starts_with('?') {
            cursor = start + 1;
            continue;
        }

        let tag_end = start + 1 + tag_close(after_lt)?;
        let tag = &xml[start + 1..tag_end];

        if tag.ends_with('/') {
            return Some(Element {
                tag,
                content: "",
                outer: &xml[start..=tag_end],
                end: tag_end + 1,
            });
        }

        let close = format!("</{qname}>");
        let content_start = tag_end + 1;
        let content_len = xml[content_start..].find(&close)?;
        let end = content_start + content_len + close.len();
        return Some(Element {
            tag,
            content: &xml[content_start..content_start + content_len],
            outer: &xml[start..end],
            end,
        });
    }
    None
}

/// Returns the offset of the `>` ending a start tag, skipping quoted values.
fn tag_close(s: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in s.char_indices() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (None, '>') => return Some(i),
            (Some(q), _) if q == c => quote = None,
            _ => {}
        }
    }
    None
}

/// Finds every element with the given local name.
pub(crate) fn find_all<'a>(xml: &'a str, local_name: &str) -> Vec<Element<'a>> {
    let mut found = Vec::new();
    let mut cursor = 0;
    while let Some(element) = find_element(xml, local_name, cursor) {
        cursor = element.end;
        found.push(element);
    }
    found
}

/// Returns the local name of the document's root element.
pub(crate) fn root_name(xml: &str) -> Option<&str> {
    let mut cursor = 0;
    while let Some(rel) = xml.get(cursor..)?.find('<') {
        let start = cursor + rel;
        let after_lt = &xml[start + 1..];
        if after_lt.starts_with('?') || after_lt.starts_with('!') {
            cursor = start + 1;
            continue;
        }
        let name_len = after_lt
            .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
            .unwrap_or(after_lt.len());
        let qname = &after_lt[..name_len];
        return qname.rsplit(':').next();
    }
    None
}

/// Escapes text for use in XML content and attribute values.
pub(crate) fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
