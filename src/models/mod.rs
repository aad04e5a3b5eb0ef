mod alias;
mod causal_edge;
mod entity;
mod event;
mod ids;
mod image;
mod impact_edge;
mod issuer;
mod linked_company;
mod news;
mod outbox;
mod source;
mod topic;

pub use alias::{Alias, AliasOrigin};
pub use causal_edge::{CausalEdge, CausalKind, ExpectedLag, Sign};
pub use entity::{Entity, EntityKind, NewEntity};
pub use event::{Event, EventAttrs, EventType, NewEvent};
pub use ids::ContentHash;
pub use image::{Image, NewImage};
pub use impact_edge::ImpactEdge;
pub use issuer::Issuer;
pub use linked_company::{LinkedCompany, LinkMethod};
pub use news::{DedupStatus, EnrichmentStatus, InsertOutcome, News, RawMediaRef, RawNews};
pub use outbox::{BrokerEnvelope, NewOutboxEntry, OutboxRow, OutboxStatus};
pub use source::{Source, SourceConfigEntry, SourceKind};
pub use topic::{Classification, NewsSubtype, NewsType, Topic};
