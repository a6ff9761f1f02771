pub mod app;
pub mod config;

pub mod domain {
    pub mod entities {
        pub mod dataset;
        pub mod edit;
    }
    pub mod grid {
        pub mod controller;
    }
    pub mod policy;
}

pub mod infra {
    pub mod import {
        pub mod csv;
    }
    pub mod sqlite {
        pub mod queries;
        pub mod repo;
        pub mod schema;
    }
}

pub mod platform {
    pub mod desktop {
        pub mod blocking;
    }
}

pub mod ui {
    pub mod state {
        pub mod app_state;
    }
}

pub mod usecase {
    pub mod ports {
        pub mod repo;
    }
    pub mod services {
        pub mod edit_service;
        pub mod import_service;
        pub mod query_service;
    }
}

#[cfg(test)]
mod tests;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportResult {
    pub dataset_id: i64,
    pub row_count: i64,
}
