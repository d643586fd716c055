//! 构造器与工厂方法解析
//!
//! 候选按公开优先、参数个数降序排列，逐个尝试构造参数数组，取类型差异权重最小的一个。
//! 成功的选择连同参数（或需要重新解析的参数准备信息）缓存在合并定义上。

use crate::factory::DefaultListableBeanFactory;
use crate::value_resolver::{BeanDefinitionValueResolver, ResolvedValue};
use di_abstractions::{
    Args, AutowireMode, BeanFactory, BeanList, BeanValue, DependencyDescriptor, InjectionKind,
    InjectionPoint, ParamDescriptor, PreparedArgument, ResolvedExecutable, RootBeanDefinition,
    ValueHolder,
};
use infrastructure_common::{BeanError, BeanObject, BeanResult};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, trace};

/// 一次候选尝试得到的参数
struct ArgumentsHolder {
    args: Vec<Option<BeanObject>>,
    prepared: Vec<PreparedArgument>,
    resolve_necessary: bool,
    weight: u32,
}

impl ArgumentsHolder {
    fn with_capacity(size: usize) -> Self {
        Self {
            args: Vec::with_capacity(size),
            prepared: Vec::with_capacity(size),
            resolve_necessary: false,
            weight: 0,
        }
    }

    fn store_cache(&self, definition: &RootBeanDefinition, executable: ResolvedExecutable) {
        let mut cache = definition.constructor_cache();
        cache.resolved = Some(executable);
        cache.args_resolved = true;
        if self.resolve_necessary {
            cache.prepared_args = Some(self.prepared.clone());
            cache.resolved_args = None;
        } else {
            cache.resolved_args = Some(self.args.clone());
            cache.prepared_args = None;
        }
    }
}

/// 预先解析的构造参数值
struct ResolvedArguments<'d> {
    indexed: BTreeMap<usize, (ResolvedValue, &'d ValueHolder)>,
    generic: Vec<(ResolvedValue, &'d ValueHolder)>,
}

fn holder_matches(holder: &ValueHolder, param: &ParamDescriptor) -> bool {
    let type_matches = holder
        .type_name
        .as_deref()
        .map_or(true, |t| t == param.type_key.name || t == param.type_key.short_name());
    let name_matches = holder
        .name
        .as_deref()
        .map_or(true, |n| param.name.as_deref() == Some(n));
    type_matches && name_matches
}

/// 一个待选的构造器或工厂方法
struct Candidate<'c> {
    index: usize,
    params: &'c [ParamDescriptor],
}

pub(crate) struct ConstructorResolver<'a> {
    factory: &'a DefaultListableBeanFactory,
}

impl<'a> ConstructorResolver<'a> {
    pub(crate) fn new(factory: &'a DefaultListableBeanFactory) -> Self {
        Self { factory }
    }

    /// 构造器自动装配；`chosen` 为处理器给出的候选，`explicit_args` 为调用方传入的参数
    pub(crate) fn autowire_constructor(
        &self,
        name: &str,
        definition: &RootBeanDefinition,
        chosen: Option<Vec<usize>>,
        explicit_args: Option<&[BeanObject]>,
    ) -> BeanResult<BeanObject> {
        let class = definition.resolved_class().ok_or_else(|| BeanError::DefinitionStore {
            name: name.to_string(),
            message: "构造器自动装配需要已解析的类".to_string(),
        })?;
        let owner = self.factory.owner()?;
        let strategy = self.factory.instantiation_strategy();
        let constructors = class.constructors();
        let point = |constructor: usize, index: usize| InjectionPoint::ConstructorParameter {
            class: class.name().to_string(),
            constructor,
            index,
        };

        if explicit_args.is_none() {
            let params_of = |executable: ResolvedExecutable| match executable {
                ResolvedExecutable::Constructor(index) => constructors.get(index).map(|c| c.params.as_slice()),
                ResolvedExecutable::FactoryMethod(_) => None,
            };
            if let Some((index, args)) = self.cached_arguments(name, definition, params_of, &point)? {
                trace!("bean '{}' 使用缓存的构造器 #{}", name, index);
                return strategy.instantiate_with_constructor(
                    definition,
                    name,
                    &owner,
                    &constructors[index],
                    &Args::new(args),
                );
            }
        }

        let autowiring = chosen.is_some() || definition.autowire_mode() == AutowireMode::Constructor;
        let mut indices: Vec<usize> = chosen.unwrap_or_else(|| (0..constructors.len()).collect());
        indices.retain(|i| *i < constructors.len());
        indices.sort_by(|a, b| {
            let (ca, cb) = (&constructors[*a], &constructors[*b]);
            cb.public.cmp(&ca.public).then(cb.params.len().cmp(&ca.params.len()))
        });
        let candidates: Vec<Candidate<'_>> = indices
            .into_iter()
            .map(|index| Candidate {
                index,
                params: constructors[index].params.as_slice(),
            })
            .collect();

        let (index, holder) = self.select(
            name,
            definition,
            class.name(),
            "构造器",
            &candidates,
            explicit_args,
            autowiring,
            &point,
        )?;
        if explicit_args.is_none() {
            holder.store_cache(definition, ResolvedExecutable::Constructor(index));
        }
        strategy.instantiate_with_constructor(
            definition,
            name,
            &owner,
            &constructors[index],
            &Args::new(holder.args),
        )
    }

    /// 通过静态或实例工厂方法创建
    pub(crate) fn instantiate_using_factory_method(
        &self,
        name: &str,
        definition: &RootBeanDefinition,
        explicit_args: Option<&[BeanObject]>,
    ) -> BeanResult<BeanObject> {
        let def = definition.definition();
        let method_name = def
            .factory_method_name
            .clone()
            .ok_or_else(|| BeanError::illegal_state(format!("bean '{}' 没有工厂方法", name)))?;
        let owner = self.factory.owner()?;

        let (factory_bean, factory_class, is_static) = match &def.factory_bean_name {
            Some(factory_bean_name) => {
                if factory_bean_name == name {
                    return Err(BeanError::DefinitionStore {
                        name: name.to_string(),
                        message: "factory-bean 引用指向了同一个 bean 定义".to_string(),
                    });
                }
                let factory_bean = self.factory.get_bean(factory_bean_name)?;
                if definition.is_singleton() && self.factory.singletons.contains_singleton(name) {
                    return Err(BeanError::ImplicitlyAppearedSingleton {
                        name: name.to_string(),
                    });
                }
                self.factory.register_dependent(factory_bean_name, name);
                let class = self.factory.class_of(&factory_bean, None).ok_or_else(|| {
                    BeanError::creation(name, format!("无法确定 factory-bean '{}' 的类", factory_bean_name))
                })?;
                (Some(factory_bean), class, false)
            }
            None => {
                let class = definition.resolved_class().ok_or_else(|| BeanError::DefinitionStore {
                    name: name.to_string(),
                    message: "静态工厂方法需要 bean 类".to_string(),
                })?;
                (None, class, true)
            }
        };

        let methods = factory_class.factory_methods();
        let strategy = self.factory.instantiation_strategy();
        let point = |_: usize, index: usize| InjectionPoint::FactoryMethodParameter {
            method: method_name.clone(),
            index,
        };

        if explicit_args.is_none() {
            let params_of = |executable: ResolvedExecutable| match executable {
                ResolvedExecutable::FactoryMethod(index) => methods.get(index).map(|m| m.params.as_slice()),
                ResolvedExecutable::Constructor(_) => None,
            };
            if let Some((index, args)) = self.cached_arguments(name, definition, params_of, &point)? {
                trace!("bean '{}' 使用缓存的工厂方法 '{}'", name, method_name);
                return strategy.instantiate_with_factory_method(
                    definition,
                    name,
                    &owner,
                    factory_bean.as_ref(),
                    &methods[index],
                    &Args::new(args),
                );
            }
        }

        let mut candidates: Vec<Candidate<'_>> = methods
            .iter()
            .enumerate()
            .filter(|(_, m)| m.name == method_name && m.is_static == is_static)
            .map(|(index, m)| Candidate {
                index,
                params: m.params.as_slice(),
            })
            .collect();
        if candidates.is_empty() {
            return Err(BeanError::creation(
                name,
                format!(
                    "在类 [{}] 上找不到名为 '{}' 的{}工厂方法",
                    factory_class.name(),
                    method_name,
                    if is_static { "静态" } else { "实例" }
                ),
            ));
        }
        candidates.sort_by(|a, b| b.params.len().cmp(&a.params.len()));

        let autowiring = definition.autowire_mode() == AutowireMode::Constructor;
        let (index, holder) = self.select(
            name,
            definition,
            factory_class.name(),
            "工厂方法",
            &candidates,
            explicit_args,
            autowiring,
            &point,
        )?;
        let method = &methods[index];
        definition.set_factory_method_return_type(method.return_type);
        if explicit_args.is_none() {
            holder.store_cache(definition, ResolvedExecutable::FactoryMethod(index));
        }
        strategy.instantiate_with_factory_method(
            definition,
            name,
            &owner,
            factory_bean.as_ref(),
            method,
            &Args::new(holder.args),
        )
    }

    /// 从缓存恢复参数；没有可用缓存时返回 `None`
    fn cached_arguments<'p>(
        &self,
        name: &str,
        definition: &RootBeanDefinition,
        params_of: impl Fn(ResolvedExecutable) -> Option<&'p [ParamDescriptor]>,
        point: &dyn Fn(usize, usize) -> InjectionPoint,
    ) -> BeanResult<Option<(usize, Vec<Option<BeanObject>>)>> {
        let (executable, resolved_args, prepared_args) = {
            let cache = definition.constructor_cache();
            match (cache.resolved, cache.args_resolved) {
                (Some(executable), true) => (
                    executable,
                    cache.resolved_args.clone(),
                    cache.prepared_args.clone(),
                ),
                _ => return Ok(None),
            }
        };
        let Some(params) = params_of(executable) else {
            return Ok(None);
        };
        let index = match executable {
            ResolvedExecutable::Constructor(index) | ResolvedExecutable::FactoryMethod(index) => index,
        };
        let args = match (resolved_args, prepared_args) {
            (Some(args), _) => args,
            (None, Some(prepared)) => {
                self.resolve_prepared_arguments(name, definition, params, &prepared, &|i| point(index, i))?
            }
            (None, None) => return Ok(None),
        };
        Ok(Some((index, args)))
    }

    #[allow(clippy::too_many_arguments)]
    fn select(
        &self,
        name: &str,
        definition: &RootBeanDefinition,
        class_name: &str,
        kind: &str,
        candidates: &[Candidate<'_>],
        explicit_args: Option<&[BeanObject]>,
        autowiring: bool,
        point: &dyn Fn(usize, usize) -> InjectionPoint,
    ) -> BeanResult<(usize, ArgumentsHolder)> {
        let constructor_args = &definition.definition().constructor_args;
        let min_args = match explicit_args {
            Some(args) => args.len(),
            None => {
                let max_index = constructor_args.indexed().keys().next_back().map_or(0, |i| i + 1);
                max_index.max(constructor_args.argument_count())
            }
        };
        let resolved = match explicit_args {
            Some(_) => None,
            None => Some(self.resolve_constructor_arguments(name, definition)?),
        };

        let mut best: Option<(usize, ArgumentsHolder)> = None;
        let mut ambiguous: Vec<usize> = Vec::new();
        let mut causes: Vec<BeanError> = Vec::new();

        for candidate in candidates {
            let count = candidate.params.len();
            if let Some((_, holder)) = &best {
                if holder.args.len() > count {
                    break;
                }
            }
            if count < min_args {
                continue;
            }

            let holder = match (explicit_args, &resolved) {
                (Some(args), _) => match self.explicit_arguments(args, candidate.params) {
                    Some(holder) => holder,
                    None => continue,
                },
                (None, Some(resolved)) => {
                    match self.create_argument_array(
                        name,
                        definition,
                        resolved,
                        candidate.params,
                        &|i| point(candidate.index, i),
                        autowiring,
                    ) {
                        Ok(holder) => holder,
                        Err(e) => {
                            trace!("忽略 bean '{}' 的{} #{}: {}", name, kind, candidate.index, e);
                            causes.push(e);
                            continue;
                        }
                    }
                }
                (None, None) => continue,
            };

            match &best {
                Some((_, current)) if holder.weight > current.weight => {}
                Some((_, current)) if holder.weight == current.weight => ambiguous.push(candidate.index),
                _ => {
                    ambiguous.clear();
                    best = Some((candidate.index, holder));
                }
            }
        }

        let Some((index, holder)) = best else {
            if let Some(last) = causes.pop() {
                for cause in causes {
                    self.factory.singletons.on_suppressed_exception(cause);
                }
                return Err(last);
            }
            return Err(BeanError::creation(
                name,
                format!(
                    "在类 [{}] 中找不到匹配的{} (提示: 为简单参数指定下标、类型或名称以避免歧义)",
                    class_name, kind
                ),
            ));
        };

        if !ambiguous.is_empty() && !self.factory.config().lenient_constructor_resolution {
            return Err(BeanError::creation(
                name,
                format!(
                    "在类 [{}] 中找到有歧义的{}匹配: #{} 与 {:?}",
                    class_name, kind, index, ambiguous
                ),
            ));
        }
        Ok((index, holder))
    }

    fn resolve_constructor_arguments<'d>(
        &self,
        name: &str,
        definition: &'d RootBeanDefinition,
    ) -> BeanResult<ResolvedArguments<'d>> {
        let values = BeanDefinitionValueResolver::new(self.factory, name, definition);
        let constructor_args = &definition.definition().constructor_args;
        let mut resolved = ResolvedArguments {
            indexed: BTreeMap::new(),
            generic: Vec::new(),
        };
        for (index, holder) in constructor_args.indexed() {
            let value = values.resolve(&format!("构造参数 {}", index), &holder.value)?;
            resolved.indexed.insert(*index, (value, holder));
        }
        for holder in constructor_args.generic() {
            let value = values.resolve("构造参数", &holder.value)?;
            resolved.generic.push((value, holder));
        }
        Ok(resolved)
    }

    fn create_argument_array(
        &self,
        name: &str,
        definition: &RootBeanDefinition,
        resolved: &ResolvedArguments<'_>,
        params: &[ParamDescriptor],
        point: &dyn Fn(usize) -> InjectionPoint,
        autowiring: bool,
    ) -> BeanResult<ArgumentsHolder> {
        let values = BeanDefinitionValueResolver::new(self.factory, name, definition);
        let mut holder = ArgumentsHolder::with_capacity(params.len());
        let mut used_generic: HashSet<usize> = HashSet::new();
        let mut autowired_names: Vec<String> = Vec::new();

        for (index, param) in params.iter().enumerate() {
            let declared = resolved
                .indexed
                .get(&index)
                .filter(|(_, h)| holder_matches(h, param))
                .or_else(|| {
                    let position = resolved.generic.iter().enumerate().position(|(i, (value, h))| {
                        !used_generic.contains(&i)
                            && holder_matches(h, param)
                            && (h.type_name.is_some()
                                || h.name.is_some()
                                || values.is_assignable(value, param.type_key, param.kind))
                    })?;
                    used_generic.insert(position);
                    resolved.generic.get(position)
                });

            match declared {
                Some((value, value_holder)) => {
                    let weight = match value {
                        ResolvedValue::Object(object)
                            if param.type_key.is_instance(&**object) || param.type_key.is_view(&**object) =>
                        {
                            0
                        }
                        ResolvedValue::Object(_) => 2,
                        _ => 1,
                    };
                    let converted = values
                        .convert(value.clone(), param.type_key, param.kind)
                        .map_err(|e| BeanError::unsatisfied(name, point(index).to_string(), e))?;
                    holder.weight += weight;
                    holder.args.push(converted);
                    holder.prepared.push(PreparedArgument::Value(value_holder.value.clone()));
                    if value_holder.value.requires_resolution() {
                        holder.resolve_necessary = true;
                    }
                }
                None => {
                    if !autowiring {
                        return Err(BeanError::UnsatisfiedDependency {
                            bean: name.to_string(),
                            injection_point: point(index).to_string(),
                            message: format!(
                                "类型为 [{}] 的参数有歧义, 是否为简单参数指定了下标、类型或名称?",
                                param.type_key.name
                            ),
                            source: None,
                        });
                    }
                    let descriptor = DependencyDescriptor::for_parameter(point(index), param);
                    let value = self
                        .factory
                        .do_resolve_dependency(&descriptor, Some(name), &mut autowired_names)
                        .map_err(|e| BeanError::unsatisfied(name, point(index).to_string(), e))?;
                    holder.args.push(value);
                    holder.prepared.push(PreparedArgument::Autowired);
                    holder.resolve_necessary = true;
                }
            }
        }

        for autowired in &autowired_names {
            self.factory.register_dependent(autowired, name);
            debug!("按类型自动装配: bean '{}' 注入到 '{}' 的参数", autowired, name);
        }
        Ok(holder)
    }

    fn explicit_arguments(&self, args: &[BeanObject], params: &[ParamDescriptor]) -> Option<ArgumentsHolder> {
        if args.len() != params.len() {
            return None;
        }
        let mut holder = ArgumentsHolder::with_capacity(params.len());
        for (arg, param) in args.iter().zip(params) {
            let adapted = if param.kind == InjectionKind::Multiple && arg.is::<BeanList>() {
                arg.clone()
            } else {
                self.factory.adapt_object(arg, param.type_key, None)?
            };
            if (**arg).type_id() != param.type_key.id {
                holder.weight += 2;
            }
            holder.args.push(Some(adapted));
            holder.prepared.push(PreparedArgument::Value(BeanValue::Object(arg.clone())));
        }
        Some(holder)
    }

    fn resolve_prepared_arguments(
        &self,
        name: &str,
        definition: &RootBeanDefinition,
        params: &[ParamDescriptor],
        prepared: &[PreparedArgument],
        point: &dyn Fn(usize) -> InjectionPoint,
    ) -> BeanResult<Vec<Option<BeanObject>>> {
        let values = BeanDefinitionValueResolver::new(self.factory, name, definition);
        let mut autowired_names = Vec::new();
        let mut args = Vec::with_capacity(params.len());
        for (index, (param, argument)) in params.iter().zip(prepared).enumerate() {
            let value = match argument {
                PreparedArgument::Autowired => {
                    let descriptor = DependencyDescriptor::for_parameter(point(index), param);
                    self.factory
                        .do_resolve_dependency(&descriptor, Some(name), &mut autowired_names)
                        .map_err(|e| BeanError::unsatisfied(name, point(index).to_string(), e))?
                }
                PreparedArgument::Value(value) => {
                    let resolved = values.resolve(&format!("构造参数 {}", index), value)?;
                    values
                        .convert(resolved, param.type_key, param.kind)
                        .map_err(|e| BeanError::unsatisfied(name, point(index).to_string(), e))?
                }
            };
            args.push(value);
        }
        for autowired in &autowired_names {
            self.factory.register_dependent(autowired, name);
        }
        Ok(args)
    }
}
