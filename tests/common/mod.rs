#![allow(dead_code)]

pub mod fakes;

use autofill_engine::dom::parse::parse_html;
use autofill_engine::dom::{Document, NodeId};

pub const LOGIN_URL: &str = "https://example.com/login";

pub const LOGIN_PAGE: &str = r#"<!doctype html>
<html>
  <head><title>Sign in</title></head>
  <body>
    <form id="login" name="login" action="/session" method="post">
      <label for="username">Username</label>
      <input id="username" name="username" type="text" autocomplete="username">
      <label for="password">Password</label>
      <input id="password" name="password" type="password">
      <button type="submit">Sign in</button>
    </form>
  </body>
</html>"#;

pub fn login_document() -> Document {
    parse_html(LOGIN_PAGE, LOGIN_URL).expect("login page parses")
}

pub fn blank_document() -> Document {
    Document::new(LOGIN_URL)
}

pub fn body(doc: &Document) -> NodeId {
    doc.body().expect("document has a body")
}

/// First element in tree order whose `id` attribute matches.
pub fn by_id(doc: &Document, id: &str) -> NodeId {
    doc.descendants(doc.root())
        .into_iter()
        .find(|&node| doc.attribute(node, "id") == Some(id))
        .unwrap_or_else(|| panic!("no element with id {id}"))
}
