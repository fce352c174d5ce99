use crate::services::Role;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Resource {
    Tours,
    Bookings,
    Payments,
    Commissions,
    Refunds,
    Promotions,
    Services,
    Agencies,
    Dashboard,
    AuditLog,
}

impl Resource {
    pub fn segment(&self) -> &'static str {
        match self {
            Resource::Tours => "tours",
            Resource::Bookings => "bookings",
            Resource::Payments => "payments",
            Resource::Commissions => "commissions",
            Resource::Refunds => "refunds",
            Resource::Promotions => "promotions",
            Resource::Services => "services",
            Resource::Agencies => "agencies",
            Resource::Dashboard => "dashboard",
            Resource::AuditLog => "audit-log",
        }
    }

    pub fn from_segment(segment: &str) -> Option<Resource> {
        match segment {
            "tours" => Some(Resource::Tours),
            "bookings" => Some(Resource::Bookings),
            "payments" => Some(Resource::Payments),
            "commissions" => Some(Resource::Commissions),
            "refunds" => Some(Resource::Refunds),
            "promotions" => Some(Resource::Promotions),
            "services" => Some(Resource::Services),
            "agencies" => Some(Resource::Agencies),
            "dashboard" => Some(Resource::Dashboard),
            "audit-log" => Some(Resource::AuditLog),
            _ => None,
        }
    }

    pub fn all() -> &'static [Resource] {
        &[
            Resource::Tours,
            Resource::Bookings,
            Resource::Payments,
            Resource::Commissions,
            Resource::Refunds,
            Resource::Promotions,
            Resource::Services,
            Resource::Agencies,
            Resource::Dashboard,
            Resource::AuditLog,
        ]
    }
}

pub fn collection_path(role: Role, resource: Resource) -> String {
    format!("/{}/{}", role.path_prefix(), resource.segment())
}

pub fn item_path(role: Role, resource: Resource, id: i64) -> String {
    format!("/{}/{}/{}", role.path_prefix(), resource.segment(), id)
}

#[derive(Clone, Debug, Default)]
pub struct ListQuery {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
    pub q: Option<String>,
    pub status: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

impl ListQuery {
    pub fn to_query_string(&self) -> String {
        let mut parts = Vec::new();
        if let Some(page) = self.page {
            parts.push(format!("page={page}"));
        }
        if let Some(per_page) = self.per_page {
            parts.push(format!("per_page={per_page}"));
        }
        if let Some(q) = &self.q {
            parts.push(format!("q={q}"));
        }
        if let Some(status) = &self.status {
            parts.push(format!("status={status}"));
        }
        if let Some(from) = &self.from {
            parts.push(format!("from={from}"));
        }
        if let Some(to) = &self.to {
            parts.push(format!("to={to}"));
        }
        if parts.is_empty() {
            String::new()
        } else {
            format!("?{}", parts.join("&"))
        }
    }
}

pub fn list_path(role: Role, resource: Resource, query: &ListQuery) -> String {
    format!(
        "{}{}",
        collection_path(role, resource),
        query.to_query_string()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_carry_the_role_prefix() {
        assert_eq!(collection_path(Role::Admin, Resource::Tours), "/admin/tours");
        assert_eq!(
            collection_path(Role::Agency, Resource::Bookings),
            "/agency/bookings"
        );
        assert_eq!(item_path(Role::Admin, Resource::Refunds, 9), "/admin/refunds/9");
    }

    #[test]
    fn segments_round_trip() {
        for resource in Resource::all() {
            assert_eq!(Resource::from_segment(resource.segment()), Some(*resource));
        }
        assert_eq!(Resource::from_segment("nonsense"), None);
    }

    #[test]
    fn list_queries_render_in_order() {
        let query = ListQuery {
            page: Some(2),
            per_page: Some(25),
            q: Some("kyoto".into()),
            status: Some("published".into()),
            ..ListQuery::default()
        };
        assert_eq!(
            list_path(Role::Agency, Resource::Tours, &query),
            "/agency/tours?page=2&per_page=25&q=kyoto&status=published"
        );
        assert_eq!(
            list_path(Role::Admin, Resource::Dashboard, &ListQuery::default()),
            "/admin/dashboard"
        );
    }
}
