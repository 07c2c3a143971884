//! Text generation seam and its quota-managed wrapper

use crate::error::Result;
use crate::quota::QuotaManager;
use async_trait::async_trait;
use std::sync::Arc;

/// Backend that turns a prompt into text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String>;
}

#[async_trait]
impl<G: TextGenerator + ?Sized> TextGenerator for Arc<G> {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String> {
        (**self).generate(prompt, temperature).await
    }
}

/// Routes every call of the inner generator through [`QuotaManager::execute`]
pub struct QuotaGuardedGenerator<G> {
    inner: G,
    quota: Arc<QuotaManager>,
}

impl<G: TextGenerator> QuotaGuardedGenerator<G> {
    pub fn new(inner: G, quota: Arc<QuotaManager>) -> Self {
        Self { inner, quota }
    }

    pub fn quota(&self) -> &Arc<QuotaManager> {
        &self.quota
    }
}

#[async_trait]
impl<G: TextGenerator> TextGenerator for QuotaGuardedGenerator<G> {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String> {
        self.quota
            .execute(|| self.inner.generate(prompt, temperature))
            .await
    }
}
