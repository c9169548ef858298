//! Built-in category table.
//!
//! Each category groups conversations topically and selects the backend
//! model behind it; the stream endpoint segment matches the routes exposed
//! by the Ultron service.

use ratatui::style::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    pub slug: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub model: &'static str,
    pub stream_endpoint: &'static str,
    pub accent: Color,
}

pub const CATEGORIES: &[Category] = &[
    Category {
        slug: "chat",
        label: "Chat",
        description: "General conversation and open-ended questions",
        model: "gemma3:12b",
        stream_endpoint: "chat/gemma3/stream",
        accent: Color::Rgb(0x3b, 0x82, 0xf6),
    },
    Category {
        slug: "code",
        label: "Code",
        description: "Writing, debugging, and explaining code",
        model: "deepseek-coder:6.7b",
        stream_endpoint: "chat/deepseek-coder/stream",
        accent: Color::Rgb(0x14, 0xb8, 0xa6),
    },
    Category {
        slug: "image",
        label: "Image",
        description: "Understanding and describing images",
        model: "llava",
        stream_endpoint: "chat/llava/stream",
        accent: Color::Rgb(0x8b, 0x5c, 0xf6),
    },
    Category {
        slug: "document",
        label: "Document",
        description: "Document analysis and summarization",
        model: "llama3:8b",
        stream_endpoint: "chat/llama3-document/stream",
        accent: Color::Rgb(0xf9, 0x73, 0x16),
    },
    Category {
        slug: "writing",
        label: "Writing",
        description: "Blogs, stories, essays, and editing help",
        model: "llama3:8b",
        stream_endpoint: "chat/llama3-writing/stream",
        accent: Color::Rgb(0xef, 0x44, 0x44),
    },
    Category {
        slug: "knowledge",
        label: "Knowledge",
        description: "Fact-based answers across diverse fields",
        model: "llama3:8b",
        stream_endpoint: "chat/llama3-knowledge/stream",
        accent: Color::Rgb(0x10, 0xb9, 0x81),
    },
    Category {
        slug: "voice",
        label: "Voice",
        description: "Transcription and voice-note cleanup",
        model: "llama3:8b",
        stream_endpoint: "chat/llama3-voice/stream",
        accent: Color::Rgb(0xf5, 0x9e, 0x0b),
    },
];

pub fn find_category(slug: &str) -> Option<&'static Category> {
    let slug = slug.trim().to_ascii_lowercase();
    CATEGORIES.iter().find(|c| c.slug == slug)
}

pub fn default_category() -> &'static Category {
    &CATEGORIES[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(find_category("Code"), find_category("code"));
        assert!(find_category("code").is_some());
    }

    #[test]
    fn unknown_slugs_are_rejected() {
        assert!(find_category("settings").is_none());
        assert!(find_category("").is_none());
    }

    #[test]
    fn every_category_routes_to_a_stream_endpoint() {
        for category in CATEGORIES {
            assert!(category.stream_endpoint.starts_with("chat/"));
            assert!(category.stream_endpoint.ends_with("/stream"));
        }
    }

    #[test]
    fn default_category_is_chat() {
        assert_eq!(default_category().slug, "chat");
    }
}
