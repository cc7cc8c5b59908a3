//! Page source stubs

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use registry_client::RegistryError;
use registry_client::registry::types::Module;
use registry_client::search::{Page, PageFetcher};

pub fn module(namespace: &str, name: &str, version: &str) -> Module {
    Module {
        id: format!("{}/{}/aws/{}", namespace, name, version),
        namespace: namespace.to_string(),
        name: name.to_string(),
        provider: "aws".to_string(),
        version: version.to_string(),
        ..Default::default()
    }
}

/// `count` distinct modules whose names start at `first`
pub fn modules(first: usize, count: usize) -> Vec<Module> {
    (first..first + count)
        .map(|i| module("acme", &format!("module-{}", i), "1.0.0"))
        .collect()
}

/// Serves pages of the given sizes, linked by numeric cursors, and counts
/// how often it was asked for one.
pub struct StubPages {
    sizes: Vec<usize>,
    endless: bool,
    calls: AtomicUsize,
}

impl StubPages {
    pub fn new(sizes: Vec<usize>) -> Self {
        Self {
            sizes,
            endless: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Always advertises another page
    pub fn endless(page_size: usize) -> Self {
        Self {
            sizes: vec![page_size],
            endless: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher<Module> for StubPages {
    async fn fetch_page(
        &self,
        _query: &str,
        page_token: Option<&str>,
    ) -> Result<Page<Module>, RegistryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let index: usize = match page_token {
            Some(token) => token
                .parse()
                .map_err(|_| RegistryError::InvalidResponse(format!("bad cursor {}", token)))?,
            None => 0,
        };

        if self.endless {
            let size = self.sizes[0];
            let next = Some((index + 1).to_string());
            return Ok(Page::new(modules(index * size, size), next));
        }

        let Some(size) = self.sizes.get(index) else {
            return Ok(Page::last(Vec::new()));
        };
        let first: usize = self.sizes[..index].iter().sum();
        let next = (index + 1 < self.sizes.len()).then(|| (index + 1).to_string());
        Ok(Page::new(modules(first, *size), next))
    }
}
