#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_url: String,
    pub qdrant_url: String,
    pub collection: String,
    pub ollama_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    pub cache_max_entries: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            database_url: "sqlite:data/knowledge.db".to_string(),
            qdrant_url: "http://localhost:6333".to_string(),
            collection: "document_chunks".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            chat_model: "llama3".to_string(),
            cache_max_entries: 10_000,
        }
    }
}

impl AppConfig {
    /// Environment overrides on top of the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: env_or("BIND_ADDR", defaults.bind_addr),
            database_url: env_or("DATABASE_URL", defaults.database_url),
            qdrant_url: env_or("QDRANT_URL", defaults.qdrant_url),
            collection: env_or("VECTOR_COLLECTION", defaults.collection),
            ollama_url: env_or("OLLAMA_URL", defaults.ollama_url),
            embedding_model: env_or("EMBEDDING_MODEL", defaults.embedding_model),
            chat_model: env_or("CHAT_MODEL", defaults.chat_model),
            cache_max_entries: std::env::var("EMBEDDING_CACHE_MAX")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cache_max_entries),
        }
    }
}

fn env_or(name: &str, default: String) -> String {
    std::env::var(name).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_local_collaborators() {
        let config = AppConfig::default();
        assert_eq!(config.qdrant_url, "http://localhost:6333");
        assert_eq!(config.ollama_url, "http://localhost:11434");
        assert!(config.cache_max_entries > 0);
    }
}
