use std::collections::HashMap;

use bytes::Bytes;
use msgstream::attachment::{
    expand, tokenize, AttachmentLoader, AttachmentTags, AttachmentToken, ContentPart,
    ExpandOptions, Expansion, ExpansionFormat, ImageData, TagKind,
};
use msgstream::config::{load_config, AttachmentConfig};
use parking_lot::Mutex;
use uuid::Uuid;

const GIF_BYTES: &[u8] = b"GIF89a\x01\x00\x01\x00";

/// In-memory store that records every lookup.
#[derive(Default)]
struct RecordingStore {
    images: HashMap<Uuid, ImageData>,
    files: HashMap<Uuid, String>,
    lookups: Mutex<Vec<Uuid>>,
}

impl AttachmentLoader for RecordingStore {
    async fn load_image(&self, id: Uuid) -> Option<ImageData> {
        self.lookups.lock().push(id);
        tokio::task::yield_now().await;
        self.images.get(&id).cloned()
    }

    async fn load_file_text(&self, id: Uuid) -> Option<String> {
        self.lookups.lock().push(id);
        tokio::task::yield_now().await;
        self.files.get(&id).cloned()
    }
}

fn store() -> (RecordingStore, Uuid, Uuid) {
    let image = Uuid::from_u128(0xA1);
    let file = Uuid::from_u128(0xF1);
    let mut store = RecordingStore::default();
    store.images.insert(
        image,
        ImageData {
            bytes: Bytes::from_static(GIF_BYTES),
            file_name: None,
        },
    );
    store.files.insert(file, "col_a,col_b\n1,2".to_string());
    (store, image, file)
}

#[tokio::test]
async fn content_parts_follow_token_order() {
    let (store, image, file) = store();
    let options = ExpandOptions::default();
    let content = format!(
        "Compare {} with {} please",
        options.tags.wrap(TagKind::Image, image),
        options.tags.wrap(TagKind::File, file)
    );

    let expansion = expand(&content, ExpansionFormat::ContentParts, &store, &options).await;
    let json = expansion.into_json();
    assert_eq!(
        json,
        serde_json::json!([
            {"type": "text", "text": "Compare "},
            {"type": "image_url", "image_url": {"url": "data:image/gif;base64,R0lGODlhAQABAA=="}},
            {"type": "text", "text": " with "},
            {"type": "text", "text": "col_a,col_b\n1,2"},
            {"type": "text", "text": " please"},
        ])
    );
    assert_eq!(*store.lookups.lock(), vec![image, file]);
}

#[tokio::test]
async fn unresolved_image_alone_yields_one_text_part() {
    let store = RecordingStore::default();
    let options = ExpandOptions::default();
    let content = options.tags.wrap(TagKind::Image, Uuid::from_u128(5));
    let expansion = expand(&content, ExpansionFormat::ContentParts, &store, &options).await;
    assert_eq!(
        expansion,
        Expansion::Parts(vec![ContentPart::text("[Image unavailable]")])
    );
}

#[tokio::test]
async fn whitespace_only_content_still_has_a_part() {
    let store = RecordingStore::default();
    let expansion = expand(
        " \n ",
        ExpansionFormat::ContentParts,
        &store,
        &ExpandOptions::default(),
    )
    .await;
    match expansion {
        Expansion::Parts(parts) => assert_eq!(parts.len(), 1),
        Expansion::Text(_) => panic!("expected parts"),
    }
}

#[tokio::test]
async fn inline_text_inlines_files_and_describes_images() {
    let (store, image, file) = store();
    let options = ExpandOptions::default();
    let content = format!(
        "{}\n{}",
        options.tags.wrap(TagKind::File, file),
        options.tags.wrap(TagKind::Image, image)
    );
    let Expansion::Text(text) =
        expand(&content, ExpansionFormat::InlineText, &store, &options).await
    else {
        panic!("expected text");
    };
    assert!(text.starts_with("col_a,col_b\n1,2"));
    assert!(text.contains("[Image attachment: image/gif, 10 B]"));
    assert!(!text.contains("<image-uuid>"));
}

#[tokio::test]
async fn custom_delimiters_from_config() {
    let config = AttachmentConfig {
        image_tag_start: "[[img:".into(),
        image_tag_end: "]]".into(),
        file_tag_start: "[[file:".into(),
        file_tag_end: "]]".into(),
        ..AttachmentConfig::default()
    };
    let options = ExpandOptions::from_config(&config);
    let (store, image, _) = store();
    let content = format!("see [[img:{image}]] and <image-uuid>{image}</image-uuid>");

    assert_eq!(
        tokenize(&content, &options.tags),
        vec![
            AttachmentToken::Text("see ".into()),
            AttachmentToken::Image(image),
            AttachmentToken::Text(format!(" and <image-uuid>{image}</image-uuid>")),
        ]
    );
    let Expansion::Parts(parts) =
        expand(&content, ExpansionFormat::ContentParts, &store, &options).await
    else {
        panic!("expected parts");
    };
    assert_eq!(parts.len(), 3);
}

#[test]
fn capability_matrix_from_example_config() {
    let config = load_config("config.example.yaml").unwrap();
    let format_of = |name: &str| {
        ExpansionFormat::for_provider_config(config.provider(name).unwrap())
    };
    assert_eq!(format_of("openai"), ExpansionFormat::ContentParts);
    assert_eq!(format_of("anthropic"), ExpansionFormat::InlineText);
    assert_eq!(format_of("ollama"), ExpansionFormat::InlineText);
    assert_eq!(format_of("openrouter"), ExpansionFormat::ContentParts);
}

#[test]
fn default_tags_round_trip_through_tokenizer() {
    let tags = AttachmentTags::default();
    let id = Uuid::from_u128(42);
    assert_eq!(
        tokenize(&tags.wrap(TagKind::File, id), &tags),
        vec![AttachmentToken::File(id)]
    );
}
