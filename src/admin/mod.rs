mod reports;
mod service;

pub use reports::{
    CountBucket, FeedbackStats, PlatformStats, ReportKind, ReportService, SwapStats, UserStats,
};
pub use service::{AdminListUsersQuery, AdminService, SetBanRequest, SetRoleRequest};
