//! Human-readable notification text for permission changes.
//!
//! The product UI is Chinese, so rendered lines use Chinese role labels.

use crate::tags::{AuditAction, TagRole};

/// Display label for a role.
pub fn role_label(role: TagRole) -> &'static str {
    match role {
        TagRole::Admin => "管理员",
        TagRole::Editor => "编辑者",
        TagRole::Viewer => "查看者",
    }
}

/// Render one notification line for a permission mutation.
///
/// `role` is the new role for add/update and the removed role for remove.
pub fn describe_permission_change(
    actor_name: &str,
    target_name: &str,
    action: AuditAction,
    role: Option<TagRole>,
) -> String {
    match (action, role) {
        (AuditAction::Add, Some(role)) => {
            format!("{} 将 {} 添加为{}", actor_name, target_name, role_label(role))
        }
        (AuditAction::Add, None) => format!("{} 添加了 {}", actor_name, target_name),
        (AuditAction::Update, Some(role)) => format!(
            "{} 将 {} 的角色更改为{}",
            actor_name,
            target_name,
            role_label(role)
        ),
        (AuditAction::Update, None) => format!("{} 更改了 {} 的角色", actor_name, target_name),
        (AuditAction::Remove, Some(role)) => format!(
            "{} 移除了 {} 的{}权限",
            actor_name,
            target_name,
            role_label(role)
        ),
        (AuditAction::Remove, None) => format!("{} 移除了 {} 的权限", actor_name, target_name),
    }
}
