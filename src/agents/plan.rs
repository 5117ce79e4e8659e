//! 构建计划：从入口 Agent 沿 handover 递归加载描述符（纯数据），得到依赖顺序
//!
//! 顺序保证被委派的 Agent 排在委派方之前；环直接报 ConfigError。
//! 已构建的 Agent 不再加载，由调用方在实例化阶段复用。

use std::collections::HashSet;

use crate::agents::descriptor::AgentDescriptor;
use crate::core::AgentError;

#[derive(Debug, Clone, Default)]
pub struct AgentPlan {
    order: Vec<AgentDescriptor>,
}

impl AgentPlan {
    /// `load` 按 id 取描述符；`is_built` 为 true 的 id 视为已就绪，不再展开
    pub fn build<L, B>(root_id: &str, mut load: L, is_built: B) -> Result<Self, AgentError>
    where
        L: FnMut(&str) -> Result<AgentDescriptor, AgentError>,
        B: Fn(&str) -> bool,
    {
        let mut walker = Walker {
            load: &mut load,
            is_built: &is_built,
            done: HashSet::new(),
            stack: Vec::new(),
            order: Vec::new(),
        };
        walker.visit(root_id)?;
        Ok(Self {
            order: walker.order,
        })
    }

    /// 依赖顺序（目标在前，入口在最后）
    pub fn descriptors(&self) -> &[AgentDescriptor] {
        &self.order
    }

    pub fn into_descriptors(self) -> Vec<AgentDescriptor> {
        self.order
    }

    pub fn ids(&self) -> Vec<&str> {
        self.order.iter().map(|d| d.config.id.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

struct Walker<'a, L, B> {
    load: &'a mut L,
    is_built: &'a B,
    done: HashSet<String>,
    stack: Vec<String>,
    order: Vec<AgentDescriptor>,
}

impl<L, B> Walker<'_, L, B>
where
    L: FnMut(&str) -> Result<AgentDescriptor, AgentError>,
    B: Fn(&str) -> bool,
{
    fn visit(&mut self, id: &str) -> Result<(), AgentError> {
        if (self.is_built)(id) || self.done.contains(id) {
            return Ok(());
        }
        if let Some(pos) = self.stack.iter().position(|s| s == id) {
            let mut cycle = self.stack[pos..].to_vec();
            cycle.push(id.to_string());
            return Err(AgentError::ConfigError(format!(
                "handover cycle: {}",
                cycle.join(" -> ")
            )));
        }

        let descriptor = (self.load)(id)?;
        self.stack.push(id.to_string());
        for target in &descriptor.config.handover {
            self.visit(target)?;
        }
        self.stack.pop();

        self.done.insert(id.to_string());
        self.order.push(descriptor);
        Ok(())
    }
}
