//! Default stylesheet.

/// Stylesheet used when no custom CSS is supplied.
pub const DEFAULT_CSS: &str = r#"@namespace epub "http://www.idpf.org/2007/ops";

body {
  margin: 0 5%;
  font-family: serif;
  line-height: 1.5;
}

h1, h2, h3, h4, h5, h6 {
  font-family: sans-serif;
  line-height: 1.2;
  page-break-after: avoid;
}

h1 { font-size: 1.8em; margin: 1.5em 0 0.8em; }
h2 { font-size: 1.4em; margin: 1.3em 0 0.6em; }
h3 { font-size: 1.2em; margin: 1.1em 0 0.5em; }

p {
  margin: 0 0 0.6em;
  text-align: justify;
}

figure {
  margin: 1em 0;
  text-align: center;
}

figure img {
  max-width: 100%;
  height: auto;
}

section[epub|type~="frontmatter"] figure:only-child img {
  max-height: 95vh;
}

ul, ol {
  margin: 0 0 0.8em;
  padding-left: 1.5em;
}

span[epub|type~="pagebreak"] {
  display: none;
}
"#;
