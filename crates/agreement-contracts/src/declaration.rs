//! Normalizing `contract ... end` blocks.

use agreement_ast::{
    Block, ClauseList, ContractBlock, ContractClause, ContractItem, ExprKind, FunctionDecl,
    SmolStr, Span, Stmt, StmtKind, DEFAULT_RETURN_ALIAS,
};

use crate::ContractError;

/// A validated contract: the function plus the conditions it is held to.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractDeclaration {
    /// Preconditions in declaration order, across all `require(...)` lists
    pub requirements: Vec<ContractClause>,
    /// Postconditions in declaration order, across all `ensure(...)` lists
    pub ensures: Vec<ContractClause>,
    /// Name the returned value is bound to while ensures run
    pub return_alias: SmolStr,
    pub function: FunctionDecl,
    pub span: Span,
}

impl ContractDeclaration {
    /// Validate a parsed contract block.
    ///
    /// Requirement and ensure lists may appear any number of times and in any
    /// order; their clauses are concatenated. At most one `result = <name>`
    /// alias assignment is allowed. Exactly one function must be defined and
    /// it must come last.
    pub fn from_block(block: &ContractBlock) -> Result<Self, ContractError> {
        let mut requirements = Vec::new();
        let mut ensures = Vec::new();
        let mut return_alias: Option<SmolStr> = None;
        let mut function: Option<&FunctionDecl> = None;

        for item in &block.items {
            if let Some(func) = function {
                return Err(match item {
                    ContractItem::Stmt(Stmt {
                        kind: StmtKind::Function(_),
                        span,
                    }) => ContractError::MultipleFunctions { span: *span },
                    _ => ContractError::FunctionNotLast { span: func.span },
                });
            }

            match item {
                ContractItem::Require(list) => {
                    requirements.extend(non_empty(list, "require")?.iter().cloned());
                }
                ContractItem::Ensure(list) => {
                    ensures.extend(non_empty(list, "ensure")?.iter().cloned());
                }
                ContractItem::Stmt(stmt) => match &stmt.kind {
                    StmtKind::Function(func) => function = Some(func),
                    StmtKind::Assign { target, value } => {
                        let alias = return_alias_of(target, value, stmt.span)?;
                        if return_alias.is_some() {
                            return Err(ContractError::DuplicateReturnAlias { span: stmt.span });
                        }
                        return_alias = Some(alias);
                    }
                    _ => return Err(ContractError::UnexpectedStatement { span: stmt.span }),
                },
            }
        }

        let function = function
            .cloned()
            .ok_or(ContractError::MissingFunction { span: block.span })?;

        Ok(Self {
            requirements,
            ensures,
            return_alias: return_alias.unwrap_or_else(|| SmolStr::new(DEFAULT_RETURN_ALIAS)),
            function,
            span: block.span,
        })
    }

    pub fn name(&self) -> &SmolStr {
        &self.function.name.node
    }

    pub fn body(&self) -> &Block {
        &self.function.body
    }

    pub fn has_checks(&self) -> bool {
        !self.requirements.is_empty() || !self.ensures.is_empty()
    }
}

fn non_empty<'a>(
    list: &'a ClauseList,
    keyword: &'static str,
) -> Result<&'a [ContractClause], ContractError> {
    if list.clauses.is_empty() {
        Err(ContractError::EmptyClauseList {
            keyword,
            span: list.span,
        })
    } else {
        Ok(&list.clauses)
    }
}

fn return_alias_of(
    target: &agreement_ast::Expr,
    value: &agreement_ast::Expr,
    span: Span,
) -> Result<SmolStr, ContractError> {
    match (&target.kind, &value.kind) {
        (ExprKind::Ident(target), ExprKind::Ident(alias)) if target == DEFAULT_RETURN_ALIAS => {
            Ok(alias.clone())
        }
        _ => Err(ContractError::InvalidReturnAlias { span }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::contract_block;
    use pretty_assertions::assert_eq;

    fn sources(clauses: &[ContractClause]) -> Vec<&str> {
        clauses.iter().map(|c| c.source.as_str()).collect()
    }

    #[test]
    fn test_full_declaration() {
        let block = contract_block(
            r#"contract
  require(length(dict) < 2, length(key) > 0)
  ensure(length(result) > length(dict))
  fn put_entry(dict, key, value)
    put(dict, key, value)
  end
end"#,
        );
        let decl = ContractDeclaration::from_block(&block).unwrap();
        assert_eq!(decl.name(), "put_entry");
        assert_eq!(
            sources(&decl.requirements),
            vec!["length(dict) < 2", "length(key) > 0"]
        );
        assert_eq!(sources(&decl.ensures), vec!["length(result) > length(dict)"]);
        assert_eq!(decl.return_alias, "result");
        assert_eq!(decl.body().stmts.len(), 1);
    }

    #[test]
    fn test_lists_concatenate_in_order() {
        let block = contract_block(
            r#"contract
  ensure(a)
  require(b)
  ensure(c, d)
  require(e)
  fn f(a, b, c, d, e)
    nil
  end
end"#,
        );
        let decl = ContractDeclaration::from_block(&block).unwrap();
        assert_eq!(sources(&decl.requirements), vec!["b", "e"]);
        assert_eq!(sources(&decl.ensures), vec!["a", "c", "d"]);
    }

    #[test]
    fn test_only_a_function() {
        let block = contract_block("contract\n  fn f()\n    1\n  end\nend");
        let decl = ContractDeclaration::from_block(&block).unwrap();
        assert!(!decl.has_checks());
        assert_eq!(decl.return_alias, DEFAULT_RETURN_ALIAS);
    }

    #[test]
    fn test_return_alias() {
        let block = contract_block(
            r#"contract
  ensure(out > 0)
  result = out
  fn f(x)
    x
  end
end"#,
        );
        let decl = ContractDeclaration::from_block(&block).unwrap();
        assert_eq!(decl.return_alias, "out");
    }

    #[test]
    fn test_missing_function() {
        let block = contract_block("contract\n  require(x > 0)\nend");
        assert!(matches!(
            ContractDeclaration::from_block(&block),
            Err(ContractError::MissingFunction { .. })
        ));
    }

    #[test]
    fn test_duplicate_alias() {
        let block = contract_block(
            r#"contract
  result = a
  result = b
  fn f()
    1
  end
end"#,
        );
        assert!(matches!(
            ContractDeclaration::from_block(&block),
            Err(ContractError::DuplicateReturnAlias { .. })
        ));
    }

    #[test]
    fn test_empty_clause_list() {
        let block = contract_block("contract\n  require()\n  fn f()\n    1\n  end\nend");
        assert!(matches!(
            ContractDeclaration::from_block(&block),
            Err(ContractError::EmptyClauseList {
                keyword: "require",
                ..
            })
        ));
    }

    #[test]
    fn test_function_must_be_last() {
        let block = contract_block("contract\n  fn f()\n    1\n  end\n  require(true)\nend");
        assert!(matches!(
            ContractDeclaration::from_block(&block),
            Err(ContractError::FunctionNotLast { .. })
        ));
    }

    #[test]
    fn test_multiple_functions() {
        let block =
            contract_block("contract\n  fn f()\n    1\n  end\n  fn g()\n    2\n  end\nend");
        assert!(matches!(
            ContractDeclaration::from_block(&block),
            Err(ContractError::MultipleFunctions { .. })
        ));
    }

    #[test]
    fn test_invalid_alias_forms() {
        for source in [
            "contract\n  out = result\n  fn f()\n    1\n  end\nend",
            "contract\n  result = 5\n  fn f()\n    1\n  end\nend",
        ] {
            let block = contract_block(source);
            assert!(matches!(
                ContractDeclaration::from_block(&block),
                Err(ContractError::InvalidReturnAlias { .. })
            ));
        }
    }

    #[test]
    fn test_unexpected_statement() {
        let block = contract_block("contract\n  let x = 1\n  fn f()\n    x\n  end\nend");
        assert!(matches!(
            ContractDeclaration::from_block(&block),
            Err(ContractError::UnexpectedStatement { .. })
        ));
    }
}
