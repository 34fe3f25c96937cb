#![allow(dead_code)]

use std::{fs, path::Path};

use folio::{
    cache::CacheBackend,
    config::{
        CacheSettings, ContentSettings, LogFormat, LoggingSettings, RenderSettings,
        ServerSettings, Settings, SiteSettings,
    },
};
use tracing::level_filters::LevelFilter;

pub fn settings(root: &Path, backend: CacheBackend) -> Settings {
    Settings {
        server: ServerSettings {
            addr: "127.0.0.1:0".parse().expect("addr"),
        },
        logging: LoggingSettings {
            level: LevelFilter::WARN,
            format: LogFormat::Compact,
        },
        content: ContentSettings {
            root: root.join("content"),
            collections: vec!["posts".to_string(), "articles".to_string()],
            pattern: "*/page.mdx".to_string(),
            default_author: "Site Owner".to_string(),
        },
        cache: CacheSettings {
            enabled: true,
            backend,
            ttl_seconds: 3600,
            directory: root.join("cache"),
            key_prefix: Some("test".to_string()),
            entry_limit: 8,
        },
        render: RenderSettings {
            toc_max_depth: 3,
            inline_image_max_bytes: 1024 * 1024,
        },
        site: SiteSettings {
            origin: "https://example.com".to_string(),
            name: "Example".to_string(),
            locale: "en-US".to_string(),
        },
    }
}

pub fn write_entry(root: &Path, collection: &str, dir: &str, source: &str) {
    let path = root
        .join("content")
        .join(collection)
        .join(dir)
        .join("page.mdx");
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, source).expect("write entry");
}

pub fn entry_source(title: &str, created: &str, tags: &[&str], body: &str) -> String {
    format!(
        "---\ntitle: {title}\ndescription: About {title}\ncreated: {created}\ntags: [{}]\n---\n\n{body}\n",
        tags.join(", ")
    )
}
