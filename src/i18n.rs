// ==========================================
// 国际化 (i18n) 模块
// ==========================================
// 使用 rust-i18n 库
// 支持中文(默认)和英文
// 用途: 资源/配方/生产实体标识 -> 用户可见名称
// ==========================================
// 注意: rust_i18n::i18n! 宏已在 lib.rs 中初始化
// ==========================================

/// 获取当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 设置语言
///
/// # 参数
/// - locale: 语言代码("zh-CN" 或 "en")
pub fn set_locale(locale: &str) {
    rust_i18n::set_locale(locale);
}

/// 翻译消息(无参数)
///
/// 未知键由调用方处理: rust-i18n 原样回显键本身。
///
/// # 示例
/// ```no_run
/// use factory_planner::i18n::t;
/// let msg = t("resource.iron_ore");
/// ```
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息(带参数)
///
/// # 示例
/// ```no_run
/// use factory_planner::i18n::t_with_args;
/// let msg = t_with_args("catalog.recipe_not_found", &[("name", "IronPlate")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    let mut result = rust_i18n::t!(key).to_string();
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}

/// 资源标识的显示名(键: resource.<snake_case 标识>)
pub fn resource_display_name(resource: &str) -> String {
    t(&format!("resource.{}", to_snake_case(resource)))
}

/// 配方标识的显示名(键: recipe.<snake_case 标识>)
pub fn recipe_display_name(recipe: &str) -> String {
    t(&format!("recipe.{}", to_snake_case(recipe)))
}

/// 生产实体标识的显示名(键: entity.<snake_case 标识>)
pub fn entity_display_name(entity: &str) -> String {
    t(&format!("entity.{}", to_snake_case(entity)))
}

/// PascalCase 标识转 snake_case 键
fn to_snake_case(identifier: &str) -> String {
    let mut out = String::with_capacity(identifier.len() + 4);
    for (i, c) in identifier.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
