pub mod flow;
pub mod macro_data;
pub mod price;

pub use flow::{load_flow_cache, FlowData, FlowMerge, FlowPoint};
pub use macro_data::{load_macro_cache, MacroData, MacroPoint};
pub use price::{PriceApi, PriceSeries};

use std::path::Path;
use std::time::SystemTime;

/// 캐시 파일의 나이를 시간 단위로 계산
/// 파일이 없거나 메타데이터를 읽을 수 없으면 None
pub(crate) fn cache_age_hours(path: &Path) -> Option<u64> {
    let metadata = std::fs::metadata(path).ok()?;
    let modified = metadata.modified().ok()?;
    let elapsed = SystemTime::now().duration_since(modified).ok()?;
    Some(elapsed.as_secs() / 3600)
}
