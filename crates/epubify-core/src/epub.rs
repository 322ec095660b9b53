//! EPUB 3 packaging.
//!
//! Turns a book title and an ordered list of [`Article`]s into a complete
//! EPUB container:
//!
//! ```text
//! mimetype                  (stored, first entry)
//! META-INF/container.xml
//! OEBPS/content.opf         (metadata, manifest, spine)
//! OEBPS/toc.xhtml           (navigation document)
//! OEBPS/style.css
//! OEBPS/chapter0.xhtml ...  (one per article, input order)
//! ```

use std::io::{Cursor, Write};

use chrono::{DateTime, Utc};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::AppError;
use crate::models::Article;
use crate::util::escape_xml;

pub const EPUB_MIME_TYPE: &str = "application/epub+zip";
pub const PACKAGE_PATH: &str = "OEBPS/content.opf";
pub const NAV_PATH: &str = "OEBPS/toc.xhtml";
pub const STYLESHEET_PATH: &str = "OEBPS/style.css";

const CREATOR: &str = "Epubify";
const LANGUAGE: &str = "en";

const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

const STYLESHEET: &str = r#"body {
  font-family: Georgia, "Times New Roman", serif;
  font-size: 1em;
  line-height: 1.5;
  margin: 0 5%;
}

h1, h2, h3, h4, h5, h6 {
  font-family: "Helvetica Neue", Arial, sans-serif;
  line-height: 1.2;
  margin: 1.2em 0 0.6em;
}

h1 { font-size: 1.8em; border-bottom: 1px solid #ccc; padding-bottom: 0.3em; }
h2 { font-size: 1.4em; }
h3 { font-size: 1.2em; }

p { margin: 0.6em 0; text-align: left; }

a { color: #0645ad; text-decoration: none; }

pre, code {
  font-family: Menlo, Consolas, "Courier New", monospace;
  font-size: 0.85em;
}

pre {
  background: #f5f5f5;
  border: 1px solid #ddd;
  padding: 0.8em;
  white-space: pre-wrap;
  word-wrap: break-word;
}

code { background: #f5f5f5; padding: 0 0.2em; }
pre code { background: none; padding: 0; }

blockquote {
  border-left: 4px solid #ccc;
  margin: 1em 0;
  padding: 0.2em 1em;
  color: #555;
}

table { border-collapse: collapse; margin: 1em 0; width: 100%; }
th, td { border: 1px solid #ccc; padding: 0.4em; text-align: left; vertical-align: top; }
th { background: #eee; }

nav ol { list-style-type: decimal; padding-left: 1.5em; }
nav li { margin: 0.3em 0; }

.source {
  margin-top: 2em;
  padding-top: 0.5em;
  border-top: 1px solid #ccc;
  font-size: 0.8em;
  color: #666;
}
"#;

/// Internal path of the chapter generated for the `index`-th article.
pub fn chapter_path(index: usize) -> String {
    format!("OEBPS/{}", chapter_href(index))
}

fn chapter_href(index: usize) -> String {
    format!("chapter{index}.xhtml")
}

/// An assembled, not yet serialized EPUB: internal paths mapped to content,
/// in archive order.
#[derive(Debug, Clone)]
pub struct EpubDocument {
    entries: Vec<(String, Vec<u8>)>,
}

impl EpubDocument {
    /// Lay out every entry of the book. Pure apart from `generated_at`.
    pub fn assemble(title: &str, articles: &[Article], generated_at: DateTime<Utc>) -> Self {
        let mut entries = vec![
            ("mimetype".to_string(), EPUB_MIME_TYPE.as_bytes().to_vec()),
            (
                "META-INF/container.xml".to_string(),
                CONTAINER_XML.as_bytes().to_vec(),
            ),
            (
                PACKAGE_PATH.to_string(),
                package_document(title, articles.len(), generated_at).into_bytes(),
            ),
            (
                NAV_PATH.to_string(),
                navigation_document(title, articles).into_bytes(),
            ),
            (STYLESHEET_PATH.to_string(), STYLESHEET.as_bytes().to_vec()),
        ];

        for (index, article) in articles.iter().enumerate() {
            entries.push((chapter_path(index), chapter_document(article).into_bytes()));
        }

        Self { entries }
    }

    pub fn entries(&self) -> &[(String, Vec<u8>)] {
        &self.entries
    }

    /// Serialize to a zip container. `mimetype` is written first and stored
    /// uncompressed, as OCF requires.
    pub fn to_bytes(&self) -> Result<Vec<u8>, AppError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for (path, content) in &self.entries {
            let options = if path == "mimetype" { stored } else { deflated };
            zip.start_file(path.as_str(), options)?;
            zip.write_all(content)?;
        }

        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }
}

/// Builds EPUB binaries from extracted articles.
#[derive(Debug, Default, Clone, Copy)]
pub struct EpubPackager;

impl EpubPackager {
    pub fn new() -> Self {
        Self
    }

    /// Build an EPUB stamped with the current time.
    ///
    /// An empty article list is not an error: the result is a valid book
    /// with no chapters.
    pub fn build(&self, title: &str, articles: &[Article]) -> Result<Vec<u8>, AppError> {
        self.build_at(title, articles, Utc::now())
    }

    pub fn build_at(
        &self,
        title: &str,
        articles: &[Article],
        generated_at: DateTime<Utc>,
    ) -> Result<Vec<u8>, AppError> {
        let document = EpubDocument::assemble(title, articles, generated_at);
        let bytes = document.to_bytes()?;
        tracing::debug!(
            chapters = articles.len(),
            bytes = bytes.len(),
            "EPUB packaged"
        );
        Ok(bytes)
    }
}

fn package_document(title: &str, chapters: usize, generated_at: DateTime<Utc>) -> String {
    let identifier = format!("epubify-{}", generated_at.format("%Y%m%d%H%M%S"));
    let date = generated_at.format("%Y-%m-%d");
    let modified = generated_at.format("%Y-%m-%dT%H:%M:%SZ");

    let mut manifest = String::from(
        "    <item id=\"toc\" href=\"toc.xhtml\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>\n\
         \x20   <item id=\"style\" href=\"style.css\" media-type=\"text/css\"/>\n",
    );
    let mut spine = String::from("    <itemref idref=\"toc\"/>\n");
    for index in 0..chapters {
        manifest.push_str(&format!(
            "    <item id=\"chapter{index}\" href=\"{}\" media-type=\"application/xhtml+xml\"/>\n",
            chapter_href(index)
        ));
        spine.push_str(&format!("    <itemref idref=\"chapter{index}\"/>\n"));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="uid" xml:lang="{LANGUAGE}">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="uid">{identifier}</dc:identifier>
    <dc:title>{title}</dc:title>
    <dc:creator>{CREATOR}</dc:creator>
    <dc:language>{LANGUAGE}</dc:language>
    <dc:date>{date}</dc:date>
    <meta property="dcterms:modified">{modified}</meta>
  </metadata>
  <manifest>
{manifest}  </manifest>
  <spine>
{spine}  </spine>
</package>
"#,
        title = escape_xml(title),
    )
}

fn navigation_document(title: &str, articles: &[Article]) -> String {
    let mut items = String::new();
    for (index, article) in articles.iter().enumerate() {
        items.push_str(&format!(
            "        <li><a href=\"{}\">{}</a></li>\n",
            chapter_href(index),
            escape_xml(&article.title)
        ));
    }
    if articles.is_empty() {
        // EPUB navigation lists may not be empty.
        items.push_str(&format!(
            "        <li><a href=\"toc.xhtml\">{}</a></li>\n",
            escape_xml(title)
        ));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" xml:lang="{LANGUAGE}" lang="{LANGUAGE}">
<head>
  <meta charset="UTF-8"/>
  <title>{title}</title>
  <link rel="stylesheet" type="text/css" href="style.css"/>
</head>
<body>
  <nav epub:type="toc" id="toc">
    <h1>Table of Contents</h1>
    <ol>
{items}    </ol>
  </nav>
</body>
</html>
"#,
        title = escape_xml(title),
    )
}

fn chapter_document(article: &Article) -> String {
    let title = escape_xml(&article.title);
    let url = escape_xml(&article.url);
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" xml:lang="{LANGUAGE}" lang="{LANGUAGE}">
<head>
  <meta charset="UTF-8"/>
  <title>{title}</title>
  <link rel="stylesheet" type="text/css" href="style.css"/>
</head>
<body>
  <section epub:type="chapter">
    <h1>{title}</h1>
{content}
    <div class="source">
      <p>Source: <a href="{url}">{url}</a></p>
    </div>
  </section>
</body>
</html>
"#,
        content = article.content,
    )
}
