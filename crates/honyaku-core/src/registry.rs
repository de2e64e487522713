use honyaku_types::ModelDescriptor;

/// Immutable list of selectable models, never empty
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: Vec<ModelDescriptor>,
}

impl ModelRegistry {
    /// An empty list falls back to the built-in models
    pub fn new(models: Vec<ModelDescriptor>) -> Self {
        let models = if models.is_empty() {
            tracing::warn!("No models configured, using built-in list");
            honyaku_config::models::default_models()
        } else {
            models
        };
        Self { models }
    }

    pub fn get(&self, id: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|m| m.id == id)
    }

    /// The reference model
    pub fn default_model(&self) -> &ModelDescriptor {
        &self.models[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelDescriptor> {
        self.models.iter()
    }
}
