//! 表单选择器与页面脚本
//!
//! 所有页面操作都通过 JS 完成，这里只负责生成脚本，不持有 page。

use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::models::FormField;

/// 表单元素选择器（所有目标 URL 共用同一套）
#[derive(Debug, Clone)]
pub struct FormSelectors {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub date_of_birth: String,
    pub zip_code: String,
    pub checkbox: String,
    /// 需要勾选的协议复选框数量（取页面上最后几个）
    pub agreement_count: usize,
    pub submit_button: String,
}

impl Default for FormSelectors {
    fn default() -> Self {
        Self {
            email: r#"input[id*="email" i]"#.to_string(),
            first_name: r#"input[id*="first" i]"#.to_string(),
            last_name: r#"input[id*="last" i]"#.to_string(),
            phone: r#"input[id*="phone" i]"#.to_string(),
            date_of_birth: r#"input[id*="dob" i]"#.to_string(),
            zip_code: r#"input[id*="zip" i]"#.to_string(),
            checkbox: r#"input[type="checkbox"]"#.to_string(),
            agreement_count: 2,
            submit_button: "button.form-submit".to_string(),
        }
    }
}

impl FormSelectors {
    pub fn for_field(&self, field: FormField) -> &str {
        match field {
            FormField::Email => &self.email,
            FormField::FirstName => &self.first_name,
            FormField::LastName => &self.last_name,
            FormField::Phone => &self.phone,
            FormField::DateOfBirth => &self.date_of_birth,
            FormField::ZipCode => &self.zip_code,
        }
    }
}

/// 复选框勾选结果
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct AgreementReport {
    pub found: usize,
    pub checked: usize,
}

/// 填写单个输入框，返回是否找到元素
///
/// 使用原生 setter 赋值并派发 input/change 事件，框架托管的输入框才能感知变化。
pub fn fill_field_script(selector: &str, value: &str) -> Result<String, serde_json::Error> {
    Ok(format!(
        r#"
        (() => {{
            const el = document.querySelector({selector});
            if (!el) {{
                return false;
            }}
            el.scrollIntoView({{ block: 'center' }});
            el.focus();
            const setter = Object.getOwnPropertyDescriptor(window.HTMLInputElement.prototype, 'value').set;
            setter.call(el, {value});
            el.dispatchEvent(new Event('input', {{ bubbles: true }}));
            el.dispatchEvent(new Event('change', {{ bubbles: true }}));
            el.blur();
            return true;
        }})()
        "#,
        selector = serde_json::to_string(selector)?,
        value = serde_json::to_string(value)?,
    ))
}

/// 勾选页面上最后 `count` 个复选框；`count` 为 0 时不勾选任何复选框
pub fn check_agreements_script(selector: &str, count: usize) -> Result<String, serde_json::Error> {
    Ok(format!(
        r#"
        (() => {{
            const boxes = Array.from(document.querySelectorAll({selector}));
            let checked = 0;
            if ({count} > 0 && boxes.length >= {count}) {{
                for (const box of boxes.slice(-{count})) {{
                    box.scrollIntoView({{ block: 'center' }});
                    if (!box.checked) {{
                        box.click();
                    }}
                    if (box.checked) {{
                        checked += 1;
                    }}
                }}
            }}
            return {{ found: boxes.length, checked }};
        }})()
        "#,
        selector = serde_json::to_string(selector)?,
        count = count,
    ))
}

/// 点击提交按钮，返回是否找到按钮
pub fn submit_script(selector: &str) -> Result<String, serde_json::Error> {
    Ok(format!(
        r#"
        (() => {{
            const button = document.querySelector({selector});
            if (!button) {{
                return false;
            }}
            button.click();
            return true;
        }})()
        "#,
        selector = serde_json::to_string(selector)?,
    ))
}

pub const READY_STATE_SCRIPT: &str = "document.readyState";

/// 在当前文档上打标记，返回已完成的资源请求数
///
/// 跳转后的新文档没有这个标记，据此判断提交是否触发了页面跳转。
pub const MARK_DOCUMENT_SCRIPT: &str = r#"
    (() => {
        window.__formBatchSubmitMarker = true;
        return performance.getEntriesByType('resource').length;
    })()
"#;

pub const PAGE_PROBE_SCRIPT: &str = r#"
    ({
        replaced: window.__formBatchSubmitMarker !== true,
        readyState: document.readyState,
        resources: performance.getEntriesByType('resource').length
    })
"#;

/// 提交后一次页面探测的结果
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageProbe {
    pub replaced: bool,
    pub ready_state: String,
    pub resources: usize,
}

/// 提交完成的依据
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitSettle {
    /// 页面跳转到新文档且加载完成
    Navigated,
    /// 未跳转，但提交后出现的请求已完成并保持静默
    RequestsIdle,
}

/// 根据连续的页面探测判断提交是否完成
#[derive(Debug)]
pub struct SettleTracker {
    baseline: usize,
    last_count: usize,
    last_change: Instant,
    quiet: Duration,
}

impl SettleTracker {
    pub fn new(baseline: usize, now: Instant, quiet: Duration) -> Self {
        Self {
            baseline,
            last_count: baseline,
            last_change: now,
            quiet,
        }
    }

    pub fn observe(&mut self, probe: &PageProbe, now: Instant) -> Option<SubmitSettle> {
        if probe.replaced {
            return (probe.ready_state == "complete").then_some(SubmitSettle::Navigated);
        }
        if probe.resources != self.last_count {
            self.last_count = probe.resources;
            self.last_change = now;
            return None;
        }
        if probe.resources > self.baseline && now.duration_since(self.last_change) >= self.quiet {
            return Some(SubmitSettle::RequestsIdle);
        }
        None
    }
}
