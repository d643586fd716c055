//! 值解析与候选过滤的协作接口

use crate::definition::BeanDefinition;
use crate::descriptor::DependencyDescriptor;
use infrastructure_common::{BeanObject, BeanResult, TypeKey};

/// 类型转换器：字符串 → 目标类型对象
pub trait TypeConverter: Send + Sync {
    /// 能否从字符串转换为目标类型
    fn can_convert(&self, target: TypeKey) -> bool;

    /// 把字符串转换为目标类型
    fn convert(&self, value: &str, target: TypeKey) -> BeanResult<BeanObject>;
}

/// 内嵌字符串值解析（例如 `${...}` 占位符）
pub trait StringValueResolver: Send + Sync {
    /// 解析字符串中的内嵌值
    fn resolve_string_value(&self, value: &str) -> BeanResult<String>;
}

/// 自动装配候选的信息
#[derive(Debug, Clone, Copy)]
pub struct CandidateInfo<'a> {
    /// 候选 bean 名称
    pub name: &'a str,
    /// 候选的别名
    pub aliases: &'a [String],
    /// 手动注册的单例没有定义
    pub definition: Option<&'a BeanDefinition>,
}

/// 自动装配候选过滤器
pub trait AutowireCandidateResolver: Send + Sync {
    /// 候选能否注入该依赖
    fn is_autowire_candidate(&self, candidate: &CandidateInfo<'_>, descriptor: &DependencyDescriptor) -> bool;
}

/// 只检查定义的 `autowire_candidate` 标志
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleAutowireCandidateResolver;

impl AutowireCandidateResolver for SimpleAutowireCandidateResolver {
    fn is_autowire_candidate(&self, candidate: &CandidateInfo<'_>, _descriptor: &DependencyDescriptor) -> bool {
        candidate.definition.map_or(true, |d| d.autowire_candidate)
    }
}

/// 在候选标志之外检查限定符：描述符的限定符必须等于定义的某个限定符、bean 名称或别名
#[derive(Debug, Default, Clone, Copy)]
pub struct QualifierAutowireCandidateResolver;

impl AutowireCandidateResolver for QualifierAutowireCandidateResolver {
    fn is_autowire_candidate(&self, candidate: &CandidateInfo<'_>, descriptor: &DependencyDescriptor) -> bool {
        if !SimpleAutowireCandidateResolver.is_autowire_candidate(candidate, descriptor) {
            return false;
        }
        let Some(qualifier) = descriptor.qualifier.as_deref() else {
            return true;
        };
        candidate.name == qualifier
            || candidate.aliases.iter().any(|a| a == qualifier)
            || candidate
                .definition
                .is_some_and(|d| d.qualifiers.iter().any(|q| q == qualifier))
    }
}
