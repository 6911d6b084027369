pub mod url;
pub mod visit;

pub use self::url::{is_expired, CreateUrlRequest, NewUrl, ShortenedUrl, UrlSummary};
pub use visit::{GeoInfo, UserAgentInfo, VisitRecord};
