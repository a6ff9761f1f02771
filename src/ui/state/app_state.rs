use dioxus::prelude::{use_signal, Signal};

use crate::domain::entities::dataset::GridData;
use crate::domain::grid::controller::EditableGridController;
use crate::usecase::ports::repo::{CellEditRecord, DatasetMeta};

pub struct AppState {
    pub datasets: Signal<Vec<DatasetMeta>>,
    pub selected_dataset_id: Signal<Option<i64>>,
    pub grid: Signal<GridData>,
    pub controller: Signal<EditableGridController>,
    pub history: Signal<Vec<CellEditRecord>>,
    pub busy: Signal<bool>,
    pub status: Signal<String>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            datasets: use_signal(Vec::<DatasetMeta>::new),
            selected_dataset_id: use_signal(|| None::<i64>),
            grid: use_signal(GridData::default),
            controller: use_signal(EditableGridController::new),
            history: use_signal(Vec::<CellEditRecord>::new),
            busy: use_signal(|| false),
            status: use_signal(|| "就緒".to_string()),
        }
    }
}
