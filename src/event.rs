use crate::capabilities::MapRegion;
use crate::model::{DisasterType, IncidentId, NetworkStatus};

/// Everything the shell can tell the engine. Handled one at a time by
/// [`crate::app::App::update`].
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Appeared,

    /// Map settled after a drag; its centre becomes the candidate location.
    VisibleRegionChanged { region: MapRegion },
    ZoomIn,
    ZoomOut,

    NetworkStatusChanged { status: NetworkStatus },

    DisasterTypeSelected { disaster_type: DisasterType },
    IdentifierEdited { text: String },
    SubmitRequested,
    DraftCancelled,

    HistoryItemSelected { id: IncidentId },
    DetailClosed,
    DeleteRequested { id: IncidentId },
}

impl Event {
    /// Stable name for logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Appeared => "appeared",
            Self::VisibleRegionChanged { .. } => "visible_region_changed",
            Self::ZoomIn => "zoom_in",
            Self::ZoomOut => "zoom_out",
            Self::NetworkStatusChanged { .. } => "network_status_changed",
            Self::DisasterTypeSelected { .. } => "disaster_type_selected",
            Self::IdentifierEdited { .. } => "identifier_edited",
            Self::SubmitRequested => "submit_requested",
            Self::DraftCancelled => "draft_cancelled",
            Self::HistoryItemSelected { .. } => "history_item_selected",
            Self::DetailClosed => "detail_closed",
            Self::DeleteRequested { .. } => "delete_requested",
        }
    }
}
