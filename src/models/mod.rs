pub mod envelope;
pub mod request;
pub mod resource;
pub mod session;

pub use envelope::ResponseEnvelope;
pub use request::{HttpMethod, RequestDescriptor};
pub use resource::{CarouselItem, KnowledgePoint, PageQuery, PageResult, Question, Subject, UserProfile};
pub use session::{Identity, Session, Token};
