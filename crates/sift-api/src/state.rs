use std::sync::Arc;

use sift_query::{Compiler, StaticResolver};

#[derive(Clone)]
pub struct AppState {
    pub compiler: Arc<Compiler<StaticResolver>>,
}

impl AppState {
    pub fn new(compiler: Compiler<StaticResolver>) -> Self {
        Self {
            compiler: Arc::new(compiler),
        }
    }
}
