//! Fixture builders for ted-ingest integration tests
//!
//! - [`Notice`]: an R2.0.9 `TED_EXPORT` document with configurable form, CPV
//!   code, qualification section and lots
//! - [`write_archive`]: a `YYYY-MM.tar.gz` package in a data directory
//! - [`read_rows`]: parse extracted CSV back into header-keyed records

#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const NS: &str = "http://publications.europa.eu/resource/schema/ted/R2.0.9/publication";
pub const LEGACY_NS: &str = "http://publications.europa.eu/resource/schema/ted/R2.0.8/publication";

/// Builder for a notice document
#[derive(Debug, Clone)]
pub struct Notice {
    form: String,
    cpv: String,
    language: String,
    uri: String,
    namespace: String,
    declarations: String,
    url_documents: Vec<String>,
    lefti: Option<String>,
    lots: Vec<String>,
}

impl Notice {
    pub fn new(form: &str, cpv: &str) -> Self {
        Self {
            form: form.to_string(),
            cpv: cpv.to_string(),
            language: "EN".to_string(),
            uri: format!("http://ted.europa.eu/udl?uri=TED:NOTICE:{cpv}-2021:TEXT:EN:HTML"),
            namespace: NS.to_string(),
            declarations: String::new(),
            url_documents: Vec::new(),
            lefti: None,
            lots: Vec::new(),
        }
    }

    pub fn uri(mut self, uri: &str) -> Self {
        self.uri = uri.to_string();
        self
    }

    pub fn language(mut self, language: &str) -> Self {
        self.language = language.to_string();
        self
    }

    pub fn namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }

    pub fn declare(mut self, prefix: &str, uri: &str) -> Self {
        self.declarations.push_str(&format!(r#" xmlns:{prefix}="{uri}""#));
        self
    }

    pub fn url_document(mut self, url: &str) -> Self {
        self.url_documents.push(url.to_string());
        self
    }

    /// Inner XML of the `LEFTI` section
    pub fn lefti(mut self, body: &str) -> Self {
        self.lefti = Some(body.to_string());
        self
    }

    /// Inner XML of one `OBJECT_DESCR`
    pub fn lot(mut self, body: &str) -> Self {
        self.lots.push(body.to_string());
        self
    }

    pub fn xml(&self) -> Vec<u8> {
        let urls: String = self
            .url_documents
            .iter()
            .map(|url| format!("<URL_DOCUMENT>{url}</URL_DOCUMENT>"))
            .collect();
        let lefti = self
            .lefti
            .as_ref()
            .map(|body| format!("<LEFTI>{body}</LEFTI>"))
            .unwrap_or_default();
        let lots: String = self
            .lots
            .iter()
            .map(|body| format!("<OBJECT_DESCR ITEM=\"1\">{body}</OBJECT_DESCR>"))
            .collect();

        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<TED_EXPORT xmlns="{ns}" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"{decl}>
  <CODED_DATA_SECTION>
    <NOTICE_DATA>
      <URI_LIST><URI_DOC LG="EN">{uri}</URI_DOC></URI_LIST>
    </NOTICE_DATA>
  </CODED_DATA_SECTION>
  <FORM_SECTION>
    <F02_2014 CATEGORY="ORIGINAL" FORM="{form}" LG="{lg}">
      <CONTRACTING_BODY>{urls}</CONTRACTING_BODY>
      <OBJECT_CONTRACT>
        <TITLE><P>Works</P></TITLE>
        <CPV_MAIN><CPV_CODE CODE="{cpv}"/></CPV_MAIN>
        {lots}
      </OBJECT_CONTRACT>
      {lefti}
    </F02_2014>
  </FORM_SECTION>
</TED_EXPORT>
"#,
            ns = self.namespace,
            decl = self.declarations,
            uri = self.uri,
            form = self.form,
            lg = self.language,
            cpv = self.cpv,
        )
        .into_bytes()
    }
}

pub fn tar_gz(members: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, data) in members {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, data.as_slice()).unwrap();
    }
    let tar = builder.into_inner().unwrap();

    let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(&tar).unwrap();
    encoder.finish().unwrap()
}

/// Write `<dir>/<month>.tar.gz` holding `members`
pub fn write_archive(dir: &Path, month: &str, members: &[(&str, Vec<u8>)]) -> PathBuf {
    let path = dir.join(format!("{month}.tar.gz"));
    std::fs::write(&path, tar_gz(members)).unwrap();
    path
}

/// Parse CSV output into one map per record
pub fn read_rows(csv: &[u8]) -> Vec<HashMap<String, String>> {
    let mut reader = csv::Reader::from_reader(csv);
    let headers = reader.headers().unwrap().clone();
    reader
        .records()
        .map(|record| {
            let record = record.unwrap();
            headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect()
        })
        .collect()
}
