pub mod agency;
pub mod bid;
pub mod company;
pub mod history;
pub mod product;
pub mod recommendation;

pub use agency::AgencyType;
pub use bid::{
    BidAnnouncement, BidCategory, BidId, BidOutcome, BidType, BudgetBracket, ContractType,
};
pub use company::{AgencyDelivery, CompanyProfile, DeliveryRecord, DeliverySimilarity, Penalty};
pub use history::{AgencyHistory, HistoricalObservation};
pub use product::{DnRange, Product, ProductId};
pub use recommendation::{Confidence, Recommendation};
