use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 可同步实体的类型标签（封闭集合）
///
/// 线上格式为 camelCase 字符串，与 [`EntityType::as_str`] 一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityType {
    Workspace,
    Namespace,
    DataStore,
    CoverageStore,
    WmsStore,
    WmtsStore,
    FeatureType,
    Coverage,
    WmsLayer,
    WmtsLayer,
    Layer,
    LayerGroup,
    Style,
    /// 全局配置（单例）
    GeoServer,
    Settings,
    Service,
    /// 日志配置（单例）
    Logging,
    /// 以下为嵌入在配置对象内的组件，不能作为修改事件的目标
    Contact,
    Jai,
    CoverageAccess,
}

/// 类型的归属类别，用于 `is_a` 判定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityCategory {
    /// 目录对象（工作区、命名空间、存储、资源、图层、样式……）
    Catalog,
    Store,
    Resource,
    /// 可发布对象：图层与图层组
    Published,
    /// 配置对象（全局、设置、服务、日志及其组件）
    Config,
    /// 无自然标识的配置单例
    ConfigSingleton,
}

impl EntityType {
    pub const ALL: [EntityType; 20] = [
        EntityType::Workspace,
        EntityType::Namespace,
        EntityType::DataStore,
        EntityType::CoverageStore,
        EntityType::WmsStore,
        EntityType::WmtsStore,
        EntityType::FeatureType,
        EntityType::Coverage,
        EntityType::WmsLayer,
        EntityType::WmtsLayer,
        EntityType::Layer,
        EntityType::LayerGroup,
        EntityType::Style,
        EntityType::GeoServer,
        EntityType::Settings,
        EntityType::Service,
        EntityType::Logging,
        EntityType::Contact,
        EntityType::Jai,
        EntityType::CoverageAccess,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            EntityType::Workspace => "workspace",
            EntityType::Namespace => "namespace",
            EntityType::DataStore => "dataStore",
            EntityType::CoverageStore => "coverageStore",
            EntityType::WmsStore => "wmsStore",
            EntityType::WmtsStore => "wmtsStore",
            EntityType::FeatureType => "featureType",
            EntityType::Coverage => "coverage",
            EntityType::WmsLayer => "wmsLayer",
            EntityType::WmtsLayer => "wmtsLayer",
            EntityType::Layer => "layer",
            EntityType::LayerGroup => "layerGroup",
            EntityType::Style => "style",
            EntityType::GeoServer => "geoServer",
            EntityType::Settings => "settings",
            EntityType::Service => "service",
            EntityType::Logging => "logging",
            EntityType::Contact => "contact",
            EntityType::Jai => "jai",
            EntityType::CoverageAccess => "coverageAccess",
        }
    }

    /// 判断是否属于某个更宽泛的类别
    pub fn is_a(&self, category: EntityCategory) -> bool {
        use EntityType::*;

        match category {
            EntityCategory::Catalog => matches!(
                self,
                Workspace
                    | Namespace
                    | DataStore
                    | CoverageStore
                    | WmsStore
                    | WmtsStore
                    | FeatureType
                    | Coverage
                    | WmsLayer
                    | WmtsLayer
                    | Layer
                    | LayerGroup
                    | Style
            ),
            EntityCategory::Store => {
                matches!(self, DataStore | CoverageStore | WmsStore | WmtsStore)
            }
            EntityCategory::Resource => {
                matches!(self, FeatureType | Coverage | WmsLayer | WmtsLayer)
            }
            EntityCategory::Published => matches!(self, Layer | LayerGroup),
            EntityCategory::Config => matches!(
                self,
                GeoServer | Settings | Service | Logging | Contact | Jai | CoverageAccess
            ),
            EntityCategory::ConfigSingleton => matches!(self, GeoServer | Logging),
        }
    }

    /// 是否允许构造 PreModify/PostModify 事件
    ///
    /// 目录对象全部允许；配置对象仅限全局配置、设置、日志与服务。
    pub fn is_modifiable(&self) -> bool {
        self.is_a(EntityCategory::Catalog)
            || matches!(
                self,
                EntityType::GeoServer
                    | EntityType::Settings
                    | EntityType::Logging
                    | EntityType::Service
            )
    }

    /// 是否支持属性级差量；不支持的类型以整体替换的方式修改
    pub fn supports_granular_diff(&self) -> bool {
        !matches!(self, EntityType::Logging)
    }

    /// 配置单例在事件中使用的固定标识
    pub fn well_known_id(&self) -> Option<&'static str> {
        match self {
            EntityType::GeoServer => Some("geoserver"),
            EntityType::Logging => Some("logging"),
            _ => None,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DomainError::parse(format!("unknown entity type tag: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_name_matches_serde_name() {
        for t in EntityType::ALL {
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.as_str()));
            assert_eq!(t.as_str().parse::<EntityType>().unwrap(), t);
        }
    }

    #[test]
    fn unknown_tag_is_a_parse_error() {
        let err = "mapInfo".parse::<EntityType>().unwrap_err();
        assert!(matches!(err, DomainError::Parse { .. }));
    }

    #[test]
    fn category_membership() {
        assert!(EntityType::DataStore.is_a(EntityCategory::Store));
        assert!(EntityType::WmtsStore.is_a(EntityCategory::Catalog));
        assert!(!EntityType::Layer.is_a(EntityCategory::Store));
        assert!(EntityType::Coverage.is_a(EntityCategory::Resource));
        assert!(EntityType::LayerGroup.is_a(EntityCategory::Published));
        assert!(EntityType::Logging.is_a(EntityCategory::ConfigSingleton));
        assert!(!EntityType::Settings.is_a(EntityCategory::ConfigSingleton));
        assert!(EntityType::Jai.is_a(EntityCategory::Config));
    }

    #[test]
    fn modifiable_config_types_are_restricted() {
        let allowed: Vec<_> = EntityType::ALL
            .into_iter()
            .filter(|t| t.is_a(EntityCategory::Config) && t.is_modifiable())
            .collect();
        assert_eq!(
            allowed,
            vec![
                EntityType::GeoServer,
                EntityType::Settings,
                EntityType::Service,
                EntityType::Logging
            ]
        );
    }
}
